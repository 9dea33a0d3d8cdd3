//! Durable key-value storage for serialized sync state.
//!
//! The queue and the cache mirror persist their state as named blobs
//! through the [`KeyValueStore`] contract, so any durable key-value or
//! file-backed store satisfies them. The crate ships a `SQLite`-backed
//! store for production and an in-memory store for tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::error::FieldsyncError;

use super::database::Database;

/// Durable storage for named binary blobs, surviving process restarts.
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FieldsyncError>;

    /// Write `value` under `key`, replacing any existing blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), FieldsyncError>;

    /// Remove the blob stored under `key`.
    ///
    /// Returns whether a blob was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn remove(&self, key: &str) -> Result<bool, FieldsyncError>;

    /// List all keys starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, FieldsyncError>;
}

/// `SQLite`-backed key-value store.
///
/// The connection is not shareable across threads, so it sits behind a
/// mutex; every operation is a single statement and holds the lock only
/// for its duration.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    /// Open the store at the default database location.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open() -> Result<Self, FieldsyncError> {
        Ok(Self {
            db: Mutex::new(Database::open()?),
        })
    }

    /// Open the store at a specific database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_at(path: &Path) -> Result<Self, FieldsyncError> {
        Ok(Self {
            db: Mutex::new(Database::open_at(path)?),
        })
    }

    /// Open an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, FieldsyncError> {
        Ok(Self {
            db: Mutex::new(Database::open_in_memory()?),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Database>, FieldsyncError> {
        self.db
            .lock()
            .map_err(|_| FieldsyncError::Storage("Store mutex poisoned".to_string()))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FieldsyncError> {
        let db = self.lock()?;

        db.connection()
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| FieldsyncError::Storage(format!("Failed to read key {key}: {e}")))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), FieldsyncError> {
        let db = self.lock()?;

        db.connection()
            .execute(
                r"INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                  ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(|e| FieldsyncError::Storage(format!("Failed to write key {key}: {e}")))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, FieldsyncError> {
        let db = self.lock()?;

        let rows = db
            .connection()
            .execute("DELETE FROM kv_store WHERE key = ?1", [key])
            .map_err(|e| FieldsyncError::Storage(format!("Failed to remove key {key}: {e}")))?;

        Ok(rows > 0)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, FieldsyncError> {
        let db = self.lock()?;

        let mut stmt = db
            .connection()
            .prepare("SELECT key FROM kv_store WHERE key LIKE ?1 || '%' ORDER BY key")
            .map_err(|e| FieldsyncError::Storage(format!("Failed to prepare key listing: {e}")))?;

        let rows = stmt
            .query_map([prefix], |row| row.get::<_, String>(0))
            .map_err(|e| FieldsyncError::Storage(format!("Failed to list keys: {e}")))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.map_err(|e| FieldsyncError::Storage(e.to_string()))?);
        }

        Ok(keys)
    }
}

/// In-memory key-value store.
///
/// Not durable; intended for tests and ephemeral engine instances.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, FieldsyncError> {
        self.entries
            .lock()
            .map_err(|_| FieldsyncError::Storage("Store mutex poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FieldsyncError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), FieldsyncError> {
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, FieldsyncError> {
        Ok(self.lock()?.remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, FieldsyncError> {
        let mut keys: Vec<String> = self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
