//! Persisted FIFO queue of offline mutations.
//!
//! The queue is the only durable record of work not yet acknowledged by
//! the remote store. It is serialized as a single named blob in the
//! key-value store and survives process restarts; replay order always
//! equals enqueue order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FieldsyncError;
use crate::storage::KeyValueStore;

use super::mutation::{MutationPayload, QueuedMutation};

/// Key of the queue blob in the key-value store.
pub const QUEUE_KEY: &str = "sync/queue";

/// Serialized queue state: the ordered mutations plus the id counter.
#[derive(Debug, Serialize, Deserialize)]
struct QueueState {
    next_id: u64,
    mutations: VecDeque<QueuedMutation>,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            next_id: 1,
            mutations: VecDeque::new(),
        }
    }
}

/// Ordered, persisted queue of mutations awaiting replay.
///
/// Concurrent callers serialize their read-append-persist step behind an
/// internal mutex; the lock is never held across I/O await points because
/// the queue itself performs no network I/O.
pub struct MutationQueue {
    store: Arc<dyn KeyValueStore>,
    state: Mutex<QueueState>,
}

impl MutationQueue {
    /// Open the queue, loading any persisted state from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted blob cannot be read or decoded.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Result<Self, FieldsyncError> {
        let state = match store.get(QUEUE_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => QueueState::default(),
        };

        Ok(Self {
            store,
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // A poisoned lock still holds consistent state: every mutation of
        // the state is completed in memory before persistence is attempted.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &QueueState) -> Result<(), FieldsyncError> {
        let bytes = serde_json::to_vec(state)?;
        self.store.set(QUEUE_KEY, &bytes)
    }

    /// Append a new mutation (attempts = 0) to the end of the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated queue cannot be persisted; the
    /// in-memory append is rolled back in that case.
    pub fn enqueue(
        &self,
        target: &str,
        payload: MutationPayload,
    ) -> Result<QueuedMutation, FieldsyncError> {
        let mut state = self.lock();

        let mutation = QueuedMutation::new(state.next_id, target, payload);
        state.next_id += 1;
        state.mutations.push_back(mutation.clone());

        if let Err(e) = self.persist(&state) {
            state.mutations.pop_back();
            state.next_id -= 1;
            return Err(e);
        }

        Ok(mutation)
    }

    /// Current queue length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().mutations.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().mutations.is_empty()
    }

    /// Snapshot of all queued mutations, in enqueue order.
    #[must_use]
    pub fn pending(&self) -> Vec<QueuedMutation> {
        self.lock().mutations.iter().cloned().collect()
    }

    /// Ids of all queued mutations, in enqueue order.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<u64> {
        self.lock().mutations.iter().map(|m| m.id).collect()
    }

    /// Look up a queued mutation by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<QueuedMutation> {
        self.lock().mutations.iter().find(|m| m.id == id).cloned()
    }

    /// Record a failed replay attempt: increments `attempts` and stores
    /// the error message. Returns the new attempt count.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the mutation is no longer queued, or a
    /// storage error if the queue cannot be persisted.
    pub fn record_failure(&self, id: u64, error: &str) -> Result<u32, FieldsyncError> {
        let mut state = self.lock();

        let mutation = state
            .mutations
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| FieldsyncError::NotFound(format!("mutation {id}")))?;

        mutation.attempts += 1;
        mutation.last_attempt = Some(Utc::now());
        mutation.last_error = Some(error.to_string());
        let attempts = mutation.attempts;

        self.persist(&state)?;
        Ok(attempts)
    }

    /// Remove a mutation from the queue. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated queue cannot be persisted.
    pub fn remove(&self, id: u64) -> Result<bool, FieldsyncError> {
        let mut state = self.lock();

        let before = state.mutations.len();
        state.mutations.retain(|m| m.id != id);
        let removed = state.mutations.len() < before;

        if removed {
            self.persist(&state)?;
        }

        Ok(removed)
    }

    /// Reset a mutation's attempt count so it is re-armed for the next
    /// flush (operator tooling).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the mutation is no longer queued, or a
    /// storage error if the queue cannot be persisted.
    pub fn reset_attempts(&self, id: u64) -> Result<(), FieldsyncError> {
        let mut state = self.lock();

        let mutation = state
            .mutations
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| FieldsyncError::NotFound(format!("mutation {id}")))?;

        mutation.attempts = 0;
        mutation.last_error = None;

        self.persist(&state)
    }

    /// Remove all queued mutations.
    ///
    /// # Errors
    ///
    /// Returns an error if the emptied queue cannot be persisted.
    pub fn clear(&self) -> Result<(), FieldsyncError> {
        let mut state = self.lock();
        state.mutations.clear();
        self.persist(&state)
    }

    /// Queue statistics for UI/ops indicators.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            pending: state.mutations.len(),
            oldest_pending: state.mutations.front().map(|m| m.enqueued_at),
        }
    }
}

/// Queue statistics.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    /// Number of pending mutations.
    pub pending: usize,
    /// Enqueue timestamp of the oldest pending mutation.
    pub oldest_pending: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn create_payload(title: &str) -> MutationPayload {
        MutationPayload::Create {
            record: json!({"title": title}),
        }
    }

    fn open_queue(store: &Arc<dyn KeyValueStore>) -> MutationQueue {
        MutationQueue::open(Arc::clone(store)).unwrap()
    }

    #[test]
    fn test_enqueue_assigns_increasing_ids() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = open_queue(&store);

        let a = queue.enqueue("tasks", create_payload("A")).unwrap();
        let b = queue.enqueue("tasks", create_payload("B")).unwrap();

        assert!(b.id > a.id);
        assert_eq!(a.attempts, 0);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_pending_is_fifo() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = open_queue(&store);

        for title in ["A", "B", "C"] {
            queue.enqueue("tasks", create_payload(title)).unwrap();
        }

        let ids = queue.pending_ids();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);

        let pending = queue.pending();
        assert_eq!(pending.len(), 3);
        assert!(pending.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_record_failure_increments_attempts() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = open_queue(&store);

        let m = queue.enqueue("tasks", create_payload("A")).unwrap();

        assert_eq!(queue.record_failure(m.id, "network error").unwrap(), 1);
        assert_eq!(queue.record_failure(m.id, "network error").unwrap(), 2);

        let loaded = queue.get(m.id).unwrap();
        assert_eq!(loaded.attempts, 2);
        assert_eq!(loaded.last_error.as_deref(), Some("network error"));
        assert!(loaded.last_attempt.is_some());
    }

    #[test]
    fn test_record_failure_unknown_id() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = open_queue(&store);

        assert!(matches!(
            queue.record_failure(99, "boom"),
            Err(FieldsyncError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = open_queue(&store);

        let m = queue.enqueue("tasks", create_payload("A")).unwrap();

        assert!(queue.remove(m.id).unwrap());
        assert!(!queue.remove(m.id).unwrap());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_reset_attempts() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = open_queue(&store);

        let m = queue.enqueue("tasks", create_payload("A")).unwrap();
        queue.record_failure(m.id, "timeout").unwrap();
        queue.record_failure(m.id, "timeout").unwrap();

        queue.reset_attempts(m.id).unwrap();

        let loaded = queue.get(m.id).unwrap();
        assert_eq!(loaded.attempts, 0);
        assert!(loaded.last_error.is_none());
    }

    #[test]
    fn test_persistence_round_trip() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let original = {
            let queue = open_queue(&store);
            queue.enqueue("tasks", create_payload("A")).unwrap();
            queue
                .enqueue(
                    "attendance",
                    MutationPayload::Update {
                        id: "a1".to_string(),
                        changes: json!({"checked_out": true}),
                    },
                )
                .unwrap();
            queue.record_failure(1, "timeout").unwrap();
            queue.pending()
        };

        // Simulated restart: reopen from the same store
        let reopened = open_queue(&store);
        assert_eq!(reopened.pending(), original);

        // Id counter also survives
        let next = reopened.enqueue("tasks", create_payload("C")).unwrap();
        assert!(next.id > original[1].id);
    }

    #[test]
    fn test_stats() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = open_queue(&store);

        assert_eq!(queue.stats().pending, 0);
        assert!(queue.stats().oldest_pending.is_none());

        let first = queue.enqueue("tasks", create_payload("A")).unwrap();
        queue.enqueue("tasks", create_payload("B")).unwrap();

        let stats = queue.stats();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.oldest_pending, Some(first.enqueued_at));
    }

    #[test]
    fn test_clear() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = open_queue(&store);

        queue.enqueue("tasks", create_payload("A")).unwrap();
        queue.clear().unwrap();

        assert!(queue.is_empty());

        // Cleared state is persisted too
        let reopened = open_queue(&store);
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_concurrent_enqueue_serializes() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = Arc::new(open_queue(&store));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        queue
                            .enqueue("tasks", create_payload(&format!("{t}-{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 100);

        // Ids are unique and ordered despite interleaving
        let ids = queue.pending_ids();
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), 100);
    }
}
