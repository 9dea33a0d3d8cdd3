//! The sync engine: offline mutation queue, flush loop, and cache mirror
//! composed behind one surface.
//!
//! The engine is an explicit instance owned by the application's
//! composition root; nothing here is global. Writes enqueue a persisted
//! mutation and patch the local cache in one atomic step, then return
//! immediately. A single background flusher replays the queue in enqueue
//! order whenever connectivity returns, awaiting each remote call to
//! completion before the next.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::cache::CacheMirror;
use crate::config::SyncSettings;
use crate::error::FieldsyncError;
use crate::storage::KeyValueStore;

use super::connectivity::ConnectivityEvents;
use super::mutation::{MutationKind, MutationPayload, QueuedMutation};
use super::queue::{MutationQueue, QueueStats};
use super::remote::{RemoteError, RemoteExecutor};

/// Why a mutation was discarded instead of applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// The transient-failure attempt ceiling was reached.
    AttemptCeiling,
    /// The remote executor classified the failure as permanent.
    PermanentFailure,
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AttemptCeiling => write!(f, "attempt ceiling reached"),
            Self::PermanentFailure => write!(f, "permanent remote failure"),
        }
    }
}

/// The observable record of a dropped mutation.
///
/// Discarding is accepted, explicit data loss: it is never silent, and a
/// UI built on this engine should surface these events to the user.
#[derive(Debug, Clone, Serialize)]
pub struct DiscardEvent {
    /// Id of the discarded mutation.
    pub mutation_id: u64,
    /// Collection the mutation targeted.
    pub target: String,
    /// Kind of the discarded mutation.
    pub kind: MutationKind,
    /// Failed attempts at the moment of discard.
    pub attempts: u32,
    /// Why the mutation was dropped.
    pub reason: DiscardReason,
    /// Last remote error message.
    pub error: String,
    /// When the discard happened.
    pub discarded_at: DateTime<Utc>,
}

/// Outcome of one mutation within a flush pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Applied remotely and removed from the queue. Carries the number of
    /// failed attempts that preceded the success.
    Applied {
        /// Failed attempts before this success.
        attempts: u32,
    },
    /// Failed transiently and kept for a later flush.
    Retained {
        /// Failed attempts so far.
        attempts: u32,
    },
    /// Dropped from the queue.
    Discarded(DiscardReason),
}

/// Per-mutation results of a flush pass.
#[derive(Debug, Clone)]
pub struct FlushResult {
    /// Mutation id.
    pub id: u64,
    /// Collection the mutation targeted.
    pub target: String,
    /// Mutation kind.
    pub kind: MutationKind,
    /// What happened to it.
    pub outcome: FlushOutcome,
}

/// Summary of a flush pass.
#[derive(Debug, Clone, Default)]
pub struct FlushReport {
    /// Mutations given an execution attempt.
    pub attempted: usize,
    /// Mutations applied and removed.
    pub applied: usize,
    /// Mutations kept for a later flush.
    pub retained: usize,
    /// Mutations dropped (ceiling or permanent failure).
    pub discarded: usize,
    /// Per-mutation outcomes, in processing order.
    pub results: Vec<FlushResult>,
}

impl FlushReport {
    /// Whether every attempted mutation was applied.
    #[must_use]
    pub const fn all_applied(&self) -> bool {
        self.retained == 0 && self.discarded == 0
    }
}

/// Offline sync engine over a durable store and a remote executor.
pub struct SyncEngine {
    queue: MutationQueue,
    cache: CacheMirror,
    executor: Arc<dyn RemoteExecutor>,
    online: AtomicBool,
    attempt_ceiling: u32,
    // Serializes the append-and-patch step of enqueue; never held across
    // an await point.
    write_gate: Mutex<()>,
    // Serializes flush passes so mutations replay strictly in order.
    flush_gate: tokio::sync::Mutex<()>,
    wakeup: Notify,
    discards: Mutex<Vec<DiscardEvent>>,
}

impl SyncEngine {
    /// Create an engine with default settings (attempt ceiling 3).
    ///
    /// The engine starts offline; connectivity is whatever
    /// [`Self::on_connectivity_change`] last reported.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted queue or cache state cannot be
    /// loaded.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        executor: Arc<dyn RemoteExecutor>,
    ) -> Result<Self, FieldsyncError> {
        Self::with_settings(store, executor, &SyncSettings::default())
    }

    /// Create an engine with explicit sync settings.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted queue or cache state cannot be
    /// loaded.
    pub fn with_settings(
        store: Arc<dyn KeyValueStore>,
        executor: Arc<dyn RemoteExecutor>,
        settings: &SyncSettings,
    ) -> Result<Self, FieldsyncError> {
        let queue = MutationQueue::open(Arc::clone(&store))?;
        let cache = CacheMirror::open(store)?;

        Ok(Self {
            queue,
            cache,
            executor,
            online: AtomicBool::new(false),
            attempt_ceiling: settings.attempt_ceiling,
            write_gate: Mutex::new(()),
            flush_gate: tokio::sync::Mutex::new(()),
            wakeup: Notify::new(),
            discards: Mutex::new(Vec::new()),
        })
    }

    /// Queue a write intent and patch the local cache so reads reflect it
    /// immediately.
    ///
    /// The queue append and the optimistic cache patch happen atomically
    /// with respect to each other: if the cache write fails, the append is
    /// rolled back and the error is returned. Returns without waiting for
    /// any network activity; if the engine is online, the flusher is woken.
    ///
    /// # Errors
    ///
    /// Returns an error if local persistence fails. Remote failures are
    /// never surfaced here.
    pub fn enqueue(
        &self,
        target: &str,
        payload: MutationPayload,
    ) -> Result<QueuedMutation, FieldsyncError> {
        let mutation = {
            let _gate = self.write_gate.lock().unwrap_or_else(PoisonError::into_inner);

            let mutation = self.queue.enqueue(target, payload)?;
            if let Err(e) = self.cache.apply_optimistic(target, &mutation.payload) {
                self.queue.remove(mutation.id)?;
                return Err(e);
            }
            mutation
        };

        tracing::debug!(
            id = mutation.id,
            collection = target,
            kind = %mutation.kind(),
            "mutation enqueued"
        );

        if self.is_online() {
            self.wakeup.notify_one();
        }

        Ok(mutation)
    }

    /// Number of mutations waiting to sync. Side-effect free; intended
    /// for UI indicators.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Queue statistics for UI/ops indicators.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Last reported connectivity state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Report a connectivity change.
    ///
    /// An offline-to-online transition wakes the flusher for exactly one
    /// flush pass. Going offline only records state: an in-flight remote
    /// call finishes, but the next mutation is not started.
    pub fn on_connectivity_change(&self, is_online: bool) {
        let was_online = self.online.swap(is_online, Ordering::AcqRel);

        if !was_online && is_online {
            tracing::info!("connectivity restored");
            self.wakeup.notify_one();
        } else if was_online && !is_online {
            tracing::info!("connectivity lost");
        }
    }

    /// Replay queued mutations against the remote store, in enqueue order.
    ///
    /// Each mutation gets at most one attempt per pass, and each remote
    /// call is awaited to completion before the next mutation starts. The
    /// pass stops early only when offline is observed; remote failures are
    /// recorded per mutation and never propagate to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error only if local persistence fails.
    pub async fn flush(&self) -> Result<FlushReport, FieldsyncError> {
        let _gate = self.flush_gate.lock().await;

        let mut report = FlushReport::default();
        let ids = self.queue.pending_ids();

        if ids.is_empty() || !self.is_online() {
            return Ok(report);
        }

        tracing::info!(pending = ids.len(), "flushing mutation queue");

        for id in ids {
            if !self.is_online() {
                tracing::info!("connectivity lost mid-flush, leaving remainder queued");
                break;
            }

            // Skip mutations removed since the pass started (e.g. cleared
            // by an operator).
            let Some(mutation) = self.queue.get(id) else {
                continue;
            };

            report.attempted += 1;

            match self.executor.execute(&mutation).await {
                Ok(()) => {
                    self.queue.remove(id)?;
                    report.applied += 1;
                    report.results.push(FlushResult {
                        id,
                        target: mutation.target.clone(),
                        kind: mutation.kind(),
                        outcome: FlushOutcome::Applied {
                            attempts: mutation.attempts,
                        },
                    });
                    tracing::debug!(id, collection = %mutation.target, "mutation applied");
                }
                Err(err) if err.is_transient() => {
                    let attempts = self.queue.record_failure(id, &err.to_string())?;

                    if attempts >= self.attempt_ceiling {
                        self.queue.remove(id)?;
                        self.record_discard(
                            &mutation,
                            attempts,
                            DiscardReason::AttemptCeiling,
                            &err.to_string(),
                        );
                        report.discarded += 1;
                        report.results.push(FlushResult {
                            id,
                            target: mutation.target.clone(),
                            kind: mutation.kind(),
                            outcome: FlushOutcome::Discarded(DiscardReason::AttemptCeiling),
                        });
                    } else {
                        tracing::warn!(
                            id,
                            attempts,
                            error = %err,
                            "mutation retained for a later flush"
                        );
                        report.retained += 1;
                        report.results.push(FlushResult {
                            id,
                            target: mutation.target.clone(),
                            kind: mutation.kind(),
                            outcome: FlushOutcome::Retained { attempts },
                        });
                    }
                }
                Err(err) => {
                    let attempts = self.queue.record_failure(id, &err.to_string())?;
                    self.queue.remove(id)?;
                    self.record_discard(
                        &mutation,
                        attempts,
                        DiscardReason::PermanentFailure,
                        &err.to_string(),
                    );
                    report.discarded += 1;
                    report.results.push(FlushResult {
                        id,
                        target: mutation.target.clone(),
                        kind: mutation.kind(),
                        outcome: FlushOutcome::Discarded(DiscardReason::PermanentFailure),
                    });
                }
            }
        }

        Ok(report)
    }

    fn record_discard(
        &self,
        mutation: &QueuedMutation,
        attempts: u32,
        reason: DiscardReason,
        error: &str,
    ) {
        tracing::warn!(
            id = mutation.id,
            collection = %mutation.target,
            kind = %mutation.kind(),
            attempts,
            %reason,
            error,
            "mutation discarded"
        );

        self.discards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DiscardEvent {
                mutation_id: mutation.id,
                target: mutation.target.clone(),
                kind: mutation.kind(),
                attempts,
                reason,
                error: error.to_string(),
                discarded_at: Utc::now(),
            });
    }

    /// Discard events recorded by this engine instance, oldest first.
    #[must_use]
    pub fn discard_events(&self) -> Vec<DiscardEvent> {
        self.discards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace a collection's cached records after a successful online
    /// fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted.
    pub fn refresh(&self, collection: &str, records: Vec<Value>) -> Result<(), FieldsyncError> {
        self.cache.refresh(collection, records)
    }

    /// Read the cached records of a collection. Never blocks, never
    /// touches the network.
    #[must_use]
    pub fn read(&self, collection: &str) -> Vec<Value> {
        self.cache.read(collection)
    }

    /// Timestamp of a collection's most recent wholesale refresh.
    #[must_use]
    pub fn last_synced_at(&self, collection: &str) -> Option<DateTime<Utc>> {
        self.cache.last_synced_at(collection)
    }

    /// Spawn the background flusher task.
    ///
    /// The flusher waits for wake-ups from `enqueue` and offline-to-online
    /// transitions and runs one flush pass per wake-up. It runs until the
    /// returned handle is aborted.
    pub fn spawn_flusher(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                engine.wakeup.notified().await;

                if !engine.is_online() {
                    continue;
                }

                if let Err(e) = engine.flush().await {
                    tracing::error!(error = %e, "flush pass failed");
                }
            }
        })
    }

    /// Subscribe the engine to a connectivity event stream.
    ///
    /// The task forwards every transition to
    /// [`Self::on_connectivity_change`] and ends when the monitor is
    /// dropped.
    pub fn spawn_connectivity_listener(
        self: &Arc<Self>,
        mut events: ConnectivityEvents,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(online) = events.next_transition().await {
                engine.on_connectivity_change(online);
            }
        })
    }
}
