//! Shared state handed to every request handler.

use std::path::Path;
use std::sync::Arc;

use m2m::{Config, Database, JobStore, WorkerPool};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<WorkerPool>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Opens the job database (when configured), restores previous jobs,
    /// and starts the worker pool.
    pub fn from_config(config: &Config) -> m2m::Result<Self> {
        let store = match &config.database_path {
            Some(path) => {
                let db = Database::open(Path::new(path))?;
                let store = JobStore::with_database(db);
                let restored = store.load_from_database()?;
                info!(restored, "Job store backed by {}", path);
                store
            }
            None => {
                info!("Job store is in-memory only");
                JobStore::new()
            }
        };

        let pool = WorkerPool::new(config, Arc::new(store));
        Ok(Self {
            pool: Arc::new(pool),
            max_upload_bytes: config.server.max_upload_bytes,
        })
    }
}
