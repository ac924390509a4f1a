//! Test harness for isolated pipeline runs.
//!
//! `TestHarness` owns a temporary directory laid out like a deployment:
//! - `uploads/` and `work/` for the worker pool
//! - `bin/` holding shell scripts that stand in for the transcriber and
//!   renderer
//! - a dummy soundbank file

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use m2m::{Job, JobStore, WorkerPool};

use super::builders::ConfigBuilder;

/// Transcriber that reports a few progress markers and writes the MIDI file.
pub const TRANSCRIBER_OK: &str = r#"echo "Loading model"
echo "1/100"
echo "25%"
echo "segment 2/4" >&2
echo "75%"
printf 'MThd' > "$2""#;

/// Renderer that checks the argument contract and writes the WAV file.
pub const RENDERER_OK: &str = r#"[ "$1" = "-ni" ] || { echo "bad flag $1" >&2; exit 64; }
[ -f "$2" ] || { echo "missing soundbank" >&2; exit 65; }
[ -f "$3" ] || { echo "missing midi" >&2; exit 66; }
[ "$4" = "-F" ] && [ "$6" = "-r" ] || exit 67
printf 'RIFF' > "$5""#;

pub const TRANSCRIBER_FAILS: &str = r#"echo "Loading model"
echo "CUDA error: out of memory" >&2
exit 3"#;

/// Test harness providing an isolated execution environment.
pub struct TestHarness {
    temp_dir: TempDir,
    pub upload_dir: PathBuf,
    pub work_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub soundbank: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let upload_dir = base.join("uploads");
        let work_dir = base.join("work");
        let bin_dir = base.join("bin");
        std::fs::create_dir_all(&bin_dir).expect("Failed to create bin dir");

        let soundbank = base.join("test.sf2");
        std::fs::write(&soundbank, b"sfbk").expect("Failed to write soundbank");

        Self {
            temp_dir,
            upload_dir,
            work_dir,
            bin_dir,
            soundbank,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes an executable `/bin/sh` script into `bin/`.
    pub fn write_script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.bin_dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod script");
        path
    }

    /// Config wired to this harness's directories and the given scripts.
    pub fn config_with(&self, transcriber_body: &str, renderer_body: &str) -> ConfigBuilder {
        let transcriber = self.write_script("transcriber", transcriber_body);
        let renderer = self.write_script("renderer", renderer_body);
        ConfigBuilder::new()
            .upload_directory(&self.upload_dir)
            .work_directory(&self.work_dir)
            .transcriber(&transcriber)
            .renderer(&renderer, &self.soundbank)
    }

    /// Config using the well-behaved fake tools.
    pub fn config(&self) -> ConfigBuilder {
        self.config_with(TRANSCRIBER_OK, RENDERER_OK)
    }

    pub fn pool(&self, config: &m2m::Config) -> (WorkerPool, Arc<JobStore>) {
        let store = Arc::new(JobStore::new());
        (WorkerPool::new(config, Arc::clone(&store)), store)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls until the job reaches a terminal state, returning every distinct
/// snapshot observed along the way (last one terminal).
pub async fn wait_for_terminal(pool: &WorkerPool, job_id: &str, timeout: Duration) -> Vec<Job> {
    let deadline = Instant::now() + timeout;
    let mut seen: Vec<Job> = Vec::new();

    loop {
        let job = pool.status(job_id).expect("job disappeared from the store");
        let terminal = job.is_terminal();
        if seen.last() != Some(&job) {
            seen.push(job);
        }
        if terminal {
            return seen;
        }
        assert!(
            Instant::now() < deadline,
            "job {} did not finish within {:?}; last: {:?}",
            job_id,
            timeout,
            seen.last()
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
