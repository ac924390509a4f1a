use std::path::PathBuf;
use thiserror::Error;

use crate::jobs::JobState;

#[derive(Error, Debug)]
pub enum M2mError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Rejections raised synchronously by the submission API. No job exists
/// for a submission that failed validation.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Invalid filename '{0}'")]
    InvalidFilename(String),

    #[error("Unsupported file type '{filename}' (accepted: {accepted})")]
    UnsupportedFormat { filename: String, accepted: String },

    #[error("Failed to store upload '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SubmitError {
    /// True when the caller sent bad input, as opposed to a server-side fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SubmitError::InvalidFilename(_) | SubmitError::UnsupportedFormat { .. }
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResultError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} is not completed (state: {state})")]
    NotReady { job_id: String, state: JobState },
}

pub type Result<T> = std::result::Result<T, M2mError>;
