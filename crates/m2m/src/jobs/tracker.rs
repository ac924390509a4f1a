//! Per-job progress reporting handle.

use std::sync::Arc;

use crate::jobs::job::{JobArtifacts, JobFailure, JobStep, JobUpdate};
use crate::jobs::store::JobStore;

/// Tracks progress for a single job.
///
/// Thin wrapper that turns pipeline milestones into [`JobUpdate`]s against
/// the shared [`JobStore`]. Cheap to clone.
#[derive(Clone)]
pub struct JobTracker {
    job_id: String,
    store: Arc<JobStore>,
}

impl JobTracker {
    pub fn new(job_id: &str, store: Arc<JobStore>) -> Self {
        Self {
            job_id: job_id.to_string(),
            store,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Enters `step` with a fixed progress milestone.
    pub fn update_phase(&self, step: JobStep, progress: f64, message: &str, eta: Option<u64>) {
        self.store.update(
            &self.job_id,
            JobUpdate::new()
                .step(step)
                .progress(progress)
                .message(message)
                .eta(eta),
        );
    }

    /// Reports fine-grained progress within the current step.
    pub fn report_progress(&self, progress: f64, message: &str, eta: Option<u64>) {
        self.store.update(
            &self.job_id,
            JobUpdate::new().progress(progress).message(message).eta(eta),
        );
    }

    /// Replaces the status message only.
    pub fn update_message(&self, message: &str) {
        self.store
            .update(&self.job_id, JobUpdate::new().message(message));
    }

    /// Marks the job as done with its artifacts.
    pub fn completed(&self, artifacts: JobArtifacts) {
        self.store
            .update(&self.job_id, JobUpdate::completed(artifacts));
    }

    /// Marks the job as failed.
    pub fn failed(&self, failure: JobFailure) {
        self.store.update(&self.job_id, JobUpdate::failed(failure));
    }
}
