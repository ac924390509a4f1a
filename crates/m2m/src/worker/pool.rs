use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{ResultError, SubmitError};
use crate::jobs::{Job, JobArtifacts, JobFailure, JobState, JobStore, JobTracker, JobUpdate};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::worker::job::Submission;

/// Accepts uploads, turns them into jobs, and runs each job's pipeline on
/// its own tokio task.
///
/// At most `max_concurrent_jobs` pipelines run at once; the rest wait in
/// `queued` until a permit frees up.
pub struct WorkerPool {
    pipeline: Arc<Pipeline>,
    store: Arc<JobStore>,
    permits: Arc<Semaphore>,
    upload_directory: PathBuf,
    accepted_extensions: Vec<String>,
}

impl WorkerPool {
    pub fn new(config: &Config, store: Arc<JobStore>) -> Self {
        let max_jobs = config.max_concurrent_jobs.max(1);
        let pipeline = Pipeline::new(Arc::new(PipelineConfig::from_config(config)));

        info!("Worker pool accepts up to {} concurrent jobs", max_jobs);

        Self {
            pipeline: Arc::new(pipeline),
            store,
            permits: Arc::new(Semaphore::new(max_jobs)),
            upload_directory: PathBuf::from(&config.upload_directory),
            accepted_extensions: config.accepted_extensions.clone(),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Validates and stores an upload, creates its job, and starts the
    /// pipeline in the background. Returns the job id without waiting for
    /// any processing.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn submit(&self, data: &[u8], filename: &str) -> Result<String, SubmitError> {
        let submission = Submission::validate(filename, &self.accepted_extensions)?;

        let job = self.store.create();
        let input_path = submission.upload_path(&self.upload_directory, &job.id);

        if let Err(e) = write_upload(&self.upload_directory, &input_path, data).await {
            error!("Failed to store upload for job {}: {}", job.id, e);
            self.store.update(
                &job.id,
                JobUpdate::failed(JobFailure::new(format!("Failed to store upload: {}", e))),
            );
            return Err(e);
        }

        debug!(
            "Stored {} bytes for job {} ({})",
            data.len(),
            job.id,
            submission.extension
        );

        self.spawn_job(job.id.clone(), input_path);
        Ok(job.id)
    }

    pub fn status(&self, job_id: &str) -> Option<Job> {
        self.store.get(job_id)
    }

    /// Artifacts of a finished job.
    pub fn result(&self, job_id: &str) -> Result<JobArtifacts, ResultError> {
        let job = self
            .store
            .get(job_id)
            .ok_or_else(|| ResultError::NotFound(job_id.to_string()))?;

        match (job.state, job.result) {
            (JobState::Done, Some(artifacts)) => Ok(artifacts),
            (state, _) => Err(ResultError::NotReady {
                job_id: job_id.to_string(),
                state,
            }),
        }
    }

    pub fn list(&self) -> Vec<Job> {
        self.store.list()
    }

    fn spawn_job(&self, job_id: String, input_path: PathBuf) {
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        let tracker = JobTracker::new(&job_id, Arc::clone(&self.store));

        let inner = tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracker.failed(JobFailure::new("Worker pool closed before the job started"));
                    return;
                }
            };
            debug!("Job {} acquired a worker permit", tracker.job_id());
            // The outcome is already recorded through the tracker.
            let _ = pipeline.run(tracker.job_id(), &input_path, &tracker).await;
        });

        tokio::spawn(supervise(Arc::clone(&self.store), job_id, inner));
    }
}

async fn write_upload(upload_directory: &Path, path: &Path, data: &[u8]) -> Result<(), SubmitError> {
    tokio::fs::create_dir_all(upload_directory)
        .await
        .map_err(|e| SubmitError::Io {
            path: upload_directory.to_path_buf(),
            source: e,
        })?;
    tokio::fs::write(path, data)
        .await
        .map_err(|e| SubmitError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Waits for a job task and converts an abnormal exit into a failed job.
async fn supervise(store: Arc<JobStore>, job_id: String, task: JoinHandle<()>) {
    let Err(e) = task.await else {
        return;
    };

    let reason = if e.is_panic() {
        format!("panicked: {}", panic_message(&*e.into_panic()))
    } else {
        "was cancelled".to_string()
    };
    error!("Job {} task {}", job_id, reason);

    store.update(
        &job_id,
        JobUpdate::failed(
            JobFailure::new("Internal error while running the pipeline")
                .with_trace(format!("job task {}", reason)),
        ),
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
