//! Job repository: CRUD operations for the `jobs` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub id: String,
    pub state: String,
    pub step: String,
    pub progress: f64,
    pub message: String,
    pub eta_seconds: Option<i64>,
    pub midi_path: Option<String>,
    pub audio_path: Option<String>,
    pub error: Option<String>,
    pub error_trace: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            state: row.get("state")?,
            step: row.get("step")?,
            progress: row.get("progress")?,
            message: row.get("message")?,
            eta_seconds: row.get("eta_seconds")?,
            midi_path: row.get("midi_path")?,
            audio_path: row.get("audio_path")?,
            error: row.get("error")?,
            error_trace: row.get("error_trace")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, state, step, progress, message, eta_seconds, midi_path,
             audio_path, error, error_trace, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                job.id,
                job.state,
                job.step,
                job.progress,
                job.message,
                job.eta_seconds,
                job.midi_path,
                job.audio_path,
                job.error,
                job.error_trace,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Overwrites every column except `id` and `created_at`.
/// Returns the number of rows touched (0 for an unknown id).
pub fn update(db: &Database, job: &JobRow) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET state=?2, step=?3, progress=?4, message=?5, eta_seconds=?6,
             midi_path=?7, audio_path=?8, error=?9, error_trace=?10, updated_at=?11
             WHERE id=?1",
            params![
                job.id,
                job.state,
                job.step,
                job.progress,
                job.message,
                job.eta_seconds,
                job.midi_path,
                job.audio_path,
                job.error,
                job.error_trace,
                job.updated_at,
            ],
        )?;
        Ok(changed)
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// All jobs, newest first.
pub fn list(db: &Database) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs ORDER BY created_at DESC")?;
        let rows = stmt
            .query_map([], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
