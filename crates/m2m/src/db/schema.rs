//! Job table schema, versioned through SQLite's `user_version` pragma.
//!
//! A fresh file reports version 0 and is brought up to [`SCHEMA_VERSION`]
//! inside one transaction. Files stamped with a newer version are refused.

use rusqlite::Connection;

use super::error::DatabaseError;

pub const SCHEMA_VERSION: u32 = 1;

/// DDL per schema version; entry `i` upgrades version `i` to `i + 1`.
const UPGRADES: &[&str] = &[include_str!("sql/001_create_jobs.sql")];

pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings the connection's schema up to [`SCHEMA_VERSION`].
pub fn ensure_schema(conn: &Connection) -> Result<(), DatabaseError> {
    let found = schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(DatabaseError::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    for (version, ddl) in (1..=SCHEMA_VERSION).zip(UPGRADES).skip(found as usize) {
        log::info!("Applying job schema v{}", version);
        tx.execute_batch(ddl)
            .map_err(|source| DatabaseError::Schema { version, source })?;
    }
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}
