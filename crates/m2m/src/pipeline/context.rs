use std::path::{Path, PathBuf};

use super::error::PipelineError;

/// Paths a single pipeline run reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    pub input_path: PathBuf,
    /// `<work_dir>/<job_id>/`, private to this job.
    pub job_directory: PathBuf,
    pub midi_path: PathBuf,
    pub wav_path: PathBuf,
}

impl PipelineContext {
    /// Derives the artifact paths from the input file stem.
    pub fn new(work_directory: &Path, job_id: &str, input_path: &Path) -> Result<Self, PipelineError> {
        let stem = input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                PipelineError::InvalidInput(format!(
                    "input path has no usable file name: {}",
                    input_path.display()
                ))
            })?;

        let job_directory = work_directory.join(job_id);
        Ok(Self {
            input_path: input_path.to_path_buf(),
            midi_path: job_directory.join(format!("{}.mid", stem)),
            wav_path: job_directory.join(format!("{}_render.wav", stem)),
            job_directory,
        })
    }
}
