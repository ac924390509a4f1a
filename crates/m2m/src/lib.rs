pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod pipeline;
pub mod sanitize;
pub mod worker;

pub use config::{load_config, load_config_from_str, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, M2mError, Result, ResultError, SubmitError};
pub use jobs::{Job, JobArtifacts, JobFailure, JobState, JobStep, JobStore, JobUpdate};
pub use pipeline::{estimate_eta, parse_progress, ParsedProgress, Pipeline, PipelineConfig};
pub use worker::WorkerPool;
