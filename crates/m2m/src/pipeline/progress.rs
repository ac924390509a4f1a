use crate::jobs::{JobArtifacts, JobFailure, JobStep, JobTracker};

/// Events emitted by the pipeline during execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Entering a stage at a fixed progress milestone.
    Phase {
        step: JobStep,
        progress: f64,
        message: String,
        eta_seconds: Option<u64>,
    },
    /// Progress inside the current stage.
    Progress {
        progress: f64,
        message: String,
        eta_seconds: Option<u64>,
    },
    /// Status text only; progress and ETA stay as they are.
    Message(String),
    Completed(JobArtifacts),
    Failed(JobFailure),
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges pipeline events into the job store.
impl ProgressReporter for JobTracker {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase {
                step,
                progress,
                message,
                eta_seconds,
            } => self.update_phase(step, progress, &message, eta_seconds),
            ProgressEvent::Progress {
                progress,
                message,
                eta_seconds,
            } => self.report_progress(progress, &message, eta_seconds),
            ProgressEvent::Message(message) => self.update_message(&message),
            ProgressEvent::Completed(artifacts) => self.completed(artifacts),
            ProgressEvent::Failed(failure) => self.failed(failure),
        }
    }
}
