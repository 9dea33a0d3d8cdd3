//! Local cache mirror for offline reads.
//!
//! Holds the last-known state of each record collection: replaced
//! wholesale by a successful online fetch, patched incrementally by
//! optimistic local mutations in between. Reads never touch the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FieldsyncError;
use crate::storage::KeyValueStore;
use crate::sync::MutationPayload;

/// Prefix of per-collection snapshot blobs in the key-value store.
pub const CACHE_PREFIX: &str = "cache/";

/// Cached state of one record collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    /// The cached records, as opaque JSON objects.
    pub records: Vec<Value>,
    /// Timestamp of the most recent successful wholesale refresh.
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Per-collection snapshot store, persisted as one blob per collection.
///
/// There is no eviction: a snapshot holds whatever was last fetched plus
/// offline deltas until the next refresh. Bounded retention is a
/// caller-side filtering choice at fetch time.
pub struct CacheMirror {
    store: Arc<dyn KeyValueStore>,
    collections: Mutex<HashMap<String, CollectionSnapshot>>,
}

impl CacheMirror {
    /// Open the mirror, loading all persisted collection snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if a persisted snapshot cannot be read or decoded.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Result<Self, FieldsyncError> {
        let mut collections = HashMap::new();

        for key in store.keys(CACHE_PREFIX)? {
            let Some(bytes) = store.get(&key)? else {
                continue;
            };
            let snapshot: CollectionSnapshot = serde_json::from_slice(&bytes)?;
            let name = key.trim_start_matches(CACHE_PREFIX).to_string();
            collections.insert(name, snapshot);
        }

        Ok(Self {
            store,
            collections: Mutex::new(collections),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CollectionSnapshot>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, collection: &str, snapshot: &CollectionSnapshot) -> Result<(), FieldsyncError> {
        let bytes = serde_json::to_vec(snapshot)?;
        self.store.set(&format!("{CACHE_PREFIX}{collection}"), &bytes)
    }

    /// Replace a collection's records wholesale after a successful online
    /// fetch, stamping `last_synced_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted; the previous
    /// snapshot stays in place in that case.
    pub fn refresh(&self, collection: &str, records: Vec<Value>) -> Result<(), FieldsyncError> {
        let snapshot = CollectionSnapshot {
            records,
            last_synced_at: Some(Utc::now()),
        };

        self.persist(collection, &snapshot)?;
        self.lock().insert(collection.to_string(), snapshot);

        tracing::debug!(collection, "cache refreshed");
        Ok(())
    }

    /// Apply a mutation to the cached records so reads reflect it before
    /// the remote store confirms it.
    ///
    /// Create upserts by record id when the record carries one; Update
    /// shallow-merges the changed fields into the matching record (a
    /// missing record is left untouched); Delete removes by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted; the in-memory
    /// snapshot is left unchanged in that case.
    pub fn apply_optimistic(
        &self,
        collection: &str,
        payload: &MutationPayload,
    ) -> Result<(), FieldsyncError> {
        let mut map = self.lock();
        let mut snapshot = map.get(collection).cloned().unwrap_or_default();

        match payload {
            MutationPayload::Create { record } => {
                let existing = payload
                    .record_id()
                    .and_then(|id| position_of(&snapshot.records, id));
                match existing {
                    Some(index) => snapshot.records[index] = record.clone(),
                    None => snapshot.records.push(record.clone()),
                }
            }
            MutationPayload::Update { id, changes } => {
                if let Some(index) = position_of(&snapshot.records, id) {
                    merge_fields(&mut snapshot.records[index], changes);
                }
            }
            MutationPayload::Delete { id } => {
                snapshot.records.retain(|r| record_id(r) != Some(id.as_str()));
            }
        }

        self.persist(collection, &snapshot)?;
        map.insert(collection.to_string(), snapshot);

        Ok(())
    }

    /// Current cached records of a collection. Never blocks on the
    /// network; unknown collections read as empty.
    #[must_use]
    pub fn read(&self, collection: &str) -> Vec<Value> {
        self.lock()
            .get(collection)
            .map(|s| s.records.clone())
            .unwrap_or_default()
    }

    /// Timestamp of a collection's most recent wholesale refresh.
    #[must_use]
    pub fn last_synced_at(&self, collection: &str) -> Option<DateTime<Utc>> {
        self.lock().get(collection).and_then(|s| s.last_synced_at)
    }

    /// Full snapshot of a collection, if one is cached.
    #[must_use]
    pub fn snapshot(&self, collection: &str) -> Option<CollectionSnapshot> {
        self.lock().get(collection).cloned()
    }

    /// Names of all cached collections, sorted.
    #[must_use]
    pub fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Extract the record identifier from an opaque record object.
fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn position_of(records: &[Value], id: &str) -> Option<usize> {
    records.iter().position(|r| record_id(r) == Some(id))
}

/// Shallow-merge the fields of `changes` into `record`.
fn merge_fields(record: &mut Value, changes: &Value) {
    if let (Some(target), Some(patch)) = (record.as_object_mut(), changes.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}
