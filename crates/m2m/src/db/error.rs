//! Errors raised by the durable job store.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Creating the directory that holds the database file failed.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to apply job schema v{version}: {source}")]
    Schema {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    /// The file was written by a build with a newer job schema.
    #[error("Job database schema v{found} is newer than supported v{supported}")]
    UnsupportedSchema { found: u32, supported: u32 },

    /// A stored row could not be turned back into a job.
    #[error("Invalid job row '{id}': {reason}")]
    InvalidRow { id: String, reason: String },

    #[error("Database lock poisoned")]
    LockPoisoned,
}
