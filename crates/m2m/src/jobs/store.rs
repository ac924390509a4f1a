//! Concurrent job store with optional write-through persistence.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::db::job_repo::{self, JobRow};
use crate::db::{Database, DatabaseError};
use crate::jobs::job::{Job, JobArtifacts, JobFailure, JobState, JobStep, JobUpdate};

const INTERRUPTED_MESSAGE: &str = "Interrupted: service restarted before the job finished";

// ─── Helpers ────────────────────────────────────────────────────────────────

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

fn job_to_row(job: &Job) -> JobRow {
    JobRow {
        id: job.id.clone(),
        state: job.state.as_str().to_string(),
        step: job.step.as_str().to_string(),
        progress: job.progress,
        message: job.message.clone(),
        eta_seconds: job.eta_seconds.and_then(|eta| i64::try_from(eta).ok()),
        midi_path: job
            .result
            .as_ref()
            .map(|r| r.midi_path.display().to_string()),
        audio_path: job
            .result
            .as_ref()
            .map(|r| r.audio_path.display().to_string()),
        error: job.error.as_ref().map(|e| e.message.clone()),
        error_trace: job.error.as_ref().and_then(|e| e.trace.clone()),
        created_at: job.created_at.to_rfc3339(),
        updated_at: job.updated_at.to_rfc3339(),
    }
}

fn job_from_row(row: &JobRow) -> Result<Job, DatabaseError> {
    let invalid = |reason: String| DatabaseError::InvalidRow {
        id: row.id.clone(),
        reason,
    };

    let step = JobStep::parse(&row.step).ok_or_else(|| invalid(format!("step '{}'", row.step)))?;
    let state =
        JobState::parse(&row.state).ok_or_else(|| invalid(format!("state '{}'", row.state)))?;
    if step.state() != state {
        return Err(invalid(format!("state '{}' with step '{}'", state, step)));
    }

    let result = match (state, &row.midi_path, &row.audio_path) {
        (JobState::Done, Some(midi), Some(audio)) => Some(JobArtifacts {
            midi_path: PathBuf::from(midi),
            audio_path: PathBuf::from(audio),
        }),
        (JobState::Done, _, _) => return Err(invalid("done without artifacts".to_string())),
        _ => None,
    };

    let error = match state {
        JobState::Failed => Some(JobFailure {
            message: row.error.clone().unwrap_or_default(),
            trace: row.error_trace.clone(),
        }),
        _ => None,
    };

    Ok(Job {
        id: row.id.clone(),
        state,
        step,
        progress: row.progress.clamp(0.0, 1.0),
        message: row.message.clone(),
        eta_seconds: row.eta_seconds.and_then(|eta| u64::try_from(eta).ok()),
        result,
        error,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}

/// Writes `job` to the database. A row missing because its insert failed
/// earlier is inserted now instead.
fn persist(db: &Database, job: &Job) {
    let row = job_to_row(job);
    let outcome = job_repo::update(db, &row).and_then(|changed| {
        if changed == 0 {
            log::warn!("Job {} had no database row, inserting it", job.id);
            job_repo::insert(db, &row)?;
        }
        Ok(())
    });
    if let Err(e) = outcome {
        log::error!("Failed to persist job {}: {}", job.id, e);
    }
}

// ─── JobStore ───────────────────────────────────────────────────────────────

/// Authoritative state of every job.
///
/// Readers get cloned snapshots; each update replaces the record under the
/// write lock, so a reader never observes a half-applied update. When a
/// [`Database`] is attached every change is mirrored to it.
pub struct JobStore {
    db: RwLock<Option<Database>>,
    cache: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    /// Creates an in-memory job store.
    pub fn new() -> Self {
        Self {
            db: RwLock::new(None),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a job store that writes through to `db`.
    pub fn with_database(db: Database) -> Self {
        let store = Self::new();
        store.set_database(db);
        store
    }

    pub fn set_database(&self, db: Database) {
        let mut guard = match self.db.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store DB lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = Some(db);
    }

    pub fn get_database(&self) -> Option<Database> {
        let guard = match self.db.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store DB lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.clone()
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        self.cache.read().unwrap_or_else(|poisoned| {
            log::warn!("Job store cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        self.cache.write().unwrap_or_else(|poisoned| {
            log::warn!("Job store cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Allocates a new queued job and returns it.
    pub fn create(&self) -> Job {
        let job = Job::new();
        self.write_cache().insert(job.id.clone(), job.clone());

        if let Some(db) = self.get_database() {
            if let Err(e) = job_repo::insert(&db, &job_to_row(&job)) {
                log::error!("Failed to persist new job {}: {}", job.id, e);
            }
        }

        log::debug!("Created job {}", job.id);
        job
    }

    /// Returns a snapshot of the job, falling back to the database on a
    /// cache miss.
    pub fn get(&self, id: &str) -> Option<Job> {
        if let Some(job) = self.read_cache().get(id) {
            return Some(job.clone());
        }

        let db = self.get_database()?;
        match job_repo::find_by_id(&db, id) {
            Ok(Some(row)) => match job_from_row(&row) {
                Ok(job) => Some(job),
                Err(e) => {
                    log::warn!("Ignoring unreadable job row: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to load job {} from database: {}", id, e);
                None
            }
        }
    }

    /// Merges `update` into the job with the given id.
    ///
    /// Returns `true` if the record changed. An unknown id, a terminal job,
    /// or a backwards step is a silent no-op.
    pub fn update(&self, id: &str, update: JobUpdate) -> bool {
        let snapshot = {
            let mut cache = self.write_cache();
            let Some(job) = cache.get_mut(id) else {
                log::debug!("Ignoring update for unknown job {}", id);
                return false;
            };
            if !job.apply(&update) {
                log::debug!(
                    "Ignoring update for job {} (step {}, requested {:?})",
                    id,
                    job.step,
                    update.step
                );
                return false;
            }
            job.clone()
        };

        if let Some(db) = self.get_database() {
            persist(&db, &snapshot);
        }

        true
    }

    /// Snapshot of every known job, newest first.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.read_cache().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Loads persisted jobs into the cache.
    ///
    /// Jobs that were still queued or processing belonged to a previous
    /// process and can no longer finish; they are marked failed. Returns the
    /// number of jobs loaded.
    pub fn load_from_database(&self) -> Result<usize, DatabaseError> {
        let Some(db) = self.get_database() else {
            return Ok(0);
        };

        let rows = job_repo::list(&db)?;
        let mut loaded = 0;
        let mut interrupted = Vec::new();

        {
            let mut cache = self.write_cache();
            for row in &rows {
                let mut job = match job_from_row(row) {
                    Ok(job) => job,
                    Err(e) => {
                        log::warn!("Skipping unreadable job row: {}", e);
                        continue;
                    }
                };

                if !job.is_terminal()
                    && job.apply(&JobUpdate::failed(JobFailure::new(INTERRUPTED_MESSAGE)))
                {
                    interrupted.push(job.clone());
                }

                cache.insert(job.id.clone(), job);
                loaded += 1;
            }
        }

        for job in &interrupted {
            job_repo::update(&db, &job_to_row(job))?;
        }

        log::info!(
            "Loaded {} jobs from database ({} interrupted)",
            loaded,
            interrupted.len()
        );
        Ok(loaded)
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn artifacts() -> JobArtifacts {
        JobArtifacts {
            midi_path: PathBuf::from("/work/a/song.mid"),
            audio_path: PathBuf::from("/work/a/song_render.wav"),
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = JobStore::new();
        let job = store.create();

        let fetched = store.get(&job.id).unwrap();
        assert_eq!(fetched, job);
        assert_eq!(fetched.state, JobState::Queued);
    }

    #[test]
    fn test_get_unknown_returns_none() {
        let store = JobStore::new();
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let store = JobStore::new();
        assert!(!store.update("missing", JobUpdate::new().progress(0.5)));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_update_merges_fields() {
        let store = JobStore::new();
        let job = store.create();

        assert!(store.update(
            &job.id,
            JobUpdate::new()
                .step(JobStep::Transcribing)
                .progress(0.4)
                .message("Running transcription")
        ));
        assert!(store.update(&job.id, JobUpdate::new().progress(0.55).eta(Some(30))));

        let fetched = store.get(&job.id).unwrap();
        assert_eq!(fetched.state, JobState::Processing);
        assert_eq!(fetched.step, JobStep::Transcribing);
        assert_eq!(fetched.progress, 0.55);
        assert_eq!(fetched.message, "Running transcription");
        assert_eq!(fetched.eta_seconds, Some(30));
        assert_eq!(fetched.created_at, job.created_at);
    }

    #[test]
    fn test_update_after_terminal_is_ignored() {
        let store = JobStore::new();
        let job = store.create();
        store.update(&job.id, JobUpdate::completed(artifacts()));

        assert!(!store.update(&job.id, JobUpdate::failed(JobFailure::new("late"))));
        let fetched = store.get(&job.id).unwrap();
        assert_eq!(fetched.state, JobState::Done);
        assert!(fetched.error.is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let store = JobStore::new();
        let first = store.create();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store.create();

        let ids: Vec<String> = store.list().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let store = Arc::new(JobStore::new());
        let a = store.create();
        let b = store.create();

        let handles: Vec<_> = [(a.id.clone(), "a"), (b.id.clone(), "b")]
            .into_iter()
            .map(|(id, tag)| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.update(&id, JobUpdate::new().step(JobStep::Transcribing));
                    for i in 1..=100 {
                        store.update(
                            &id,
                            JobUpdate::new()
                                .progress(0.4 + i as f64 * 0.003)
                                .message(format!("{} {}", tag, i)),
                        );
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            let id = a.id.clone();
            std::thread::spawn(move || {
                let mut last = 0.0;
                for _ in 0..200 {
                    let job = store.get(&id).unwrap();
                    assert!(job.progress >= last);
                    assert!(job.message == "Job created" || job.message.starts_with("a "));
                    last = job.progress;
                }
            })
        };

        for handle in handles {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(store.get(&a.id).unwrap().message, "a 100");
        assert_eq!(store.get(&b.id).unwrap().message, "b 100");
    }

    #[test]
    fn test_persists_through_database() {
        let db = Database::open_in_memory().unwrap();
        let store = JobStore::with_database(db.clone());
        let job = store.create();
        store.update(&job.id, JobUpdate::new().step(JobStep::Preprocessing).progress(0.1));
        store.update(&job.id, JobUpdate::completed(artifacts()));

        let row = job_repo::find_by_id(&db, &job.id).unwrap().unwrap();
        assert_eq!(row.state, "done");
        assert_eq!(row.step, "done");
        assert_eq!(row.progress, 1.0);
        assert_eq!(row.midi_path.as_deref(), Some("/work/a/song.mid"));

        // A second store over the same database sees the job.
        let reopened = JobStore::with_database(db);
        let fetched = reopened.get(&job.id).unwrap();
        assert_eq!(fetched.result, Some(artifacts()));
    }

    #[test]
    fn test_load_marks_unfinished_jobs_failed() {
        let db = Database::open_in_memory().unwrap();
        let store = JobStore::with_database(db.clone());
        let running = store.create();
        store.update(&running.id, JobUpdate::new().step(JobStep::Transcribing).progress(0.4));
        let finished = store.create();
        store.update(&finished.id, JobUpdate::completed(artifacts()));

        let restarted = JobStore::with_database(db.clone());
        assert_eq!(restarted.load_from_database().unwrap(), 2);

        let job = restarted.get(&running.id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.progress, 1.0);
        assert_eq!(job.error.unwrap().message, INTERRUPTED_MESSAGE);
        assert_eq!(restarted.get(&finished.id).unwrap().state, JobState::Done);

        let row = job_repo::find_by_id(&db, &running.id).unwrap().unwrap();
        assert_eq!(row.state, "failed");
    }

    #[test]
    fn test_update_restores_missing_row() {
        let db = Database::open_in_memory().unwrap();
        let store = JobStore::with_database(db.clone());
        let job = store.create();
        db.with_conn(|conn| {
            conn.execute("DELETE FROM jobs WHERE id = ?1", [&job.id])?;
            Ok(())
        })
        .unwrap();

        assert!(store.update(&job.id, JobUpdate::new().step(JobStep::Preprocessing).progress(0.1)));

        let row = job_repo::find_by_id(&db, &job.id).unwrap().unwrap();
        assert_eq!(row.step, "preprocessing");
        assert_eq!(row.progress, 0.1);
    }

    #[test]
    fn test_done_without_artifacts_is_not_stored() {
        let db = Database::open_in_memory().unwrap();
        let store = JobStore::with_database(db.clone());
        let job = store.create();

        assert!(!store.update(&job.id, JobUpdate::new().step(JobStep::Done)));

        let fetched = store.get(&job.id).unwrap();
        assert_eq!(fetched.state, JobState::Queued);
        assert!(fetched.result.is_none());
        let row = job_repo::find_by_id(&db, &job.id).unwrap().unwrap();
        assert_eq!(row.state, "queued");
    }

    #[test]
    fn test_row_with_inconsistent_state_is_rejected() {
        let job = Job::new();
        let mut row = job_to_row(&job);
        row.state = "done".to_string();
        assert!(job_from_row(&row).is_err());
    }
}
