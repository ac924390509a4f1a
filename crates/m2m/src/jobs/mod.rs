//! Job records, the shared job store, and per-job progress tracking.

mod job;
mod store;
mod tracker;

pub use job::{Job, JobArtifacts, JobFailure, JobState, JobStep, JobUpdate};
pub use store::JobStore;
pub use tracker::JobTracker;
