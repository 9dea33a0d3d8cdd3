//! Database migrations for fieldsync.
//!
//! Each migration upgrades the schema by one version and runs automatically
//! when the database is opened.

use rusqlite::Connection;

use crate::error::FieldsyncError;

/// Current schema version.
const CURRENT_VERSION: i32 = 1;

/// Get the current schema version from the database.
///
/// Returns 0 if no version has been set (new database).
pub fn get_version(conn: &Connection) -> Result<i32, FieldsyncError> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| FieldsyncError::Storage(format!("Failed to get schema version: {e}")))?;

    Ok(version)
}

/// Set the schema version in the database.
fn set_version(conn: &Connection, version: i32) -> Result<(), FieldsyncError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| FieldsyncError::Storage(format!("Failed to set schema version: {e}")))
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<(), FieldsyncError> {
    let current = get_version(conn)?;

    if current >= CURRENT_VERSION {
        return Ok(());
    }

    for version in (current + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
        set_version(conn, version)?;
    }

    Ok(())
}

/// Run a specific migration.
fn run_migration(conn: &Connection, version: i32) -> Result<(), FieldsyncError> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(FieldsyncError::Storage(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: the key-value blob table.
///
/// Named blobs stored here: `sync/queue` (serialized mutation queue) and
/// `cache/<collection>` (one snapshot per mirrored collection).
fn migrate_v1(conn: &Connection) -> Result<(), FieldsyncError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL,
            updated_at TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| FieldsyncError::Storage(format!("Migration v1 failed: {e}")))
}
