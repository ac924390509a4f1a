use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    ProcessFailed {
        program: String,
        status: String,
        /// Last lines the process wrote before exiting.
        output_tail: Vec<String>,
    },

    #[error("Soundbank not found: {0}")]
    MissingSoundbank(PathBuf),

    #[error("Expected output was not produced: {0}")]
    MissingArtifact(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Captured process output, empty for errors not tied to a process exit.
    pub fn output_tail(&self) -> &[String] {
        match self {
            PipelineError::ProcessFailed { output_tail, .. } => output_tail,
            _ => &[],
        }
    }
}

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocessing,
    Transcription,
    Rendering,
    Finalize,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Preprocessing => write!(f, "preprocessing"),
            Stage::Transcription => write!(f, "transcription"),
            Stage::Rendering => write!(f, "rendering"),
            Stage::Finalize => write!(f, "finalize"),
        }
    }
}

/// A [`PipelineError`] tagged with the stage that raised it.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

impl StageError {
    pub fn new(stage: Stage, source: PipelineError) -> Self {
        Self { stage, source }
    }

    /// Source chain followed by the captured process output.
    pub fn trace(&self) -> String {
        let mut trace = String::new();
        let mut current: Option<&dyn std::error::Error> = Some(self);
        while let Some(err) = current {
            if !trace.is_empty() {
                trace.push_str("\ncaused by: ");
            }
            trace.push_str(&err.to_string());
            current = err.source();
        }

        let tail = self.source.output_tail();
        if !tail.is_empty() {
            trace.push_str("\n--- process output (last ");
            trace.push_str(&tail.len().to_string());
            trace.push_str(" lines) ---");
            for line in tail {
                trace.push('\n');
                trace.push_str(line);
            }
        }
        trace
    }
}
