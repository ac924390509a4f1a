//! Job record and the partial updates applied to it.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse lifecycle status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobState::Queued),
            "processing" => Some(JobState::Processing),
            "done" => Some(JobState::Done),
            "failed" => Some(JobState::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained pipeline stage. The coarse [`JobState`] is derived from it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStep {
    Queued,
    Preprocessing,
    Transcribing,
    Rendering,
    Done,
    Error,
}

impl JobStep {
    pub fn state(&self) -> JobState {
        match self {
            JobStep::Queued => JobState::Queued,
            JobStep::Preprocessing | JobStep::Transcribing | JobStep::Rendering => {
                JobState::Processing
            }
            JobStep::Done => JobState::Done,
            JobStep::Error => JobState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    fn rank(&self) -> u8 {
        match self {
            JobStep::Queued => 0,
            JobStep::Preprocessing => 1,
            JobStep::Transcribing => 2,
            JobStep::Rendering => 3,
            JobStep::Done | JobStep::Error => 4,
        }
    }

    /// Steps only move forward; any live step may jump straight to `Error`.
    /// Staying on the current step is always allowed.
    pub fn can_advance_to(&self, next: JobStep) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        next == JobStep::Error || next.rank() > self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStep::Queued => "queued",
            JobStep::Preprocessing => "preprocessing",
            JobStep::Transcribing => "transcribing",
            JobStep::Rendering => "rendering",
            JobStep::Done => "done",
            JobStep::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStep::Queued),
            "preprocessing" => Some(JobStep::Preprocessing),
            "transcribing" => Some(JobStep::Transcribing),
            "rendering" => Some(JobStep::Rendering),
            "done" => Some(JobStep::Done),
            "error" => Some(JobStep::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output artifacts of a finished job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobArtifacts {
    pub midi_path: PathBuf,
    pub audio_path: PathBuf,
}

/// Diagnostic attached to a failed job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobFailure {
    pub message: String,
    /// Error source chain and captured process output, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl JobFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }
}

/// A tracked unit of pipeline work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub state: JobState,
    pub step: JobStep,
    /// Overall progress in `[0.0, 1.0]`; never decreases.
    pub progress: f64,
    pub message: String,
    pub eta_seconds: Option<u64>,
    /// Set only once the job is done.
    pub result: Option<JobArtifacts>,
    /// Set only once the job has failed.
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A fresh queued job with a new identifier.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            state: JobState::Queued,
            step: JobStep::Queued,
            progress: 0.0,
            message: "Job created".to_string(),
            eta_seconds: None,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Merges `update` into this record.
    ///
    /// Returns `false` and leaves the record untouched when the job is
    /// already terminal, the update would move the step backwards, or it
    /// finishes the job without artifacts.
    /// Progress is clamped so it never drops below its current value, and
    /// reaching a terminal step pins it to 1.0.
    pub fn apply(&mut self, update: &JobUpdate) -> bool {
        if self.is_terminal() {
            return false;
        }

        let step = update.step.unwrap_or(self.step);
        if !self.step.can_advance_to(step) {
            return false;
        }
        if step == JobStep::Done && update.result.is_none() {
            return false;
        }

        self.step = step;
        self.state = step.state();

        if let Some(progress) = update.progress {
            if progress.is_finite() {
                self.progress = self.progress.max(progress.clamp(0.0, 1.0));
            }
        }
        if let Some(message) = &update.message {
            self.message = message.clone();
        }
        if let Some(eta) = update.eta_seconds {
            self.eta_seconds = eta;
        }

        match step {
            JobStep::Done => {
                self.progress = 1.0;
                self.result = update.result.clone();
                self.error = None;
            }
            JobStep::Error => {
                self.progress = 1.0;
                self.result = None;
                self.error = Some(
                    update
                        .error
                        .clone()
                        .unwrap_or_else(|| JobFailure::new(self.message.clone())),
                );
            }
            _ => {}
        }

        self.updated_at = Utc::now();
        true
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial set of fields to merge into a [`Job`].
///
/// `eta_seconds` is doubly optional: `None` leaves the estimate alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub step: Option<JobStep>,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub eta_seconds: Option<Option<u64>>,
    pub result: Option<JobArtifacts>,
    pub error: Option<JobFailure>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal success update.
    pub fn completed(artifacts: JobArtifacts) -> Self {
        Self::new()
            .step(JobStep::Done)
            .progress(1.0)
            .message("Completed")
            .eta(Some(0))
            .result(artifacts)
    }

    /// Terminal failure update.
    pub fn failed(failure: JobFailure) -> Self {
        Self::new()
            .step(JobStep::Error)
            .progress(1.0)
            .message("Pipeline failed")
            .eta(None)
            .error(failure)
    }

    pub fn step(mut self, step: JobStep) -> Self {
        self.step = Some(step);
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn eta(mut self, eta_seconds: Option<u64>) -> Self {
        self.eta_seconds = Some(eta_seconds);
        self
    }

    pub fn result(mut self, artifacts: JobArtifacts) -> Self {
        self.result = Some(artifacts);
        self
    }

    pub fn error(mut self, failure: JobFailure) -> Self {
        self.error = Some(failure);
        self
    }
}
