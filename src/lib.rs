//! fieldsync - offline sync core for field-workforce clients
//!
//! This crate provides the offline mutation queue and local cache mirror
//! shared by workforce-management clients. Write intents made while
//! disconnected are persisted and replayed in enqueue order once
//! connectivity returns; reads are served from per-collection snapshots
//! that are patched optimistically and refreshed wholesale when online.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod storage;
pub mod sync;

pub use cache::CacheMirror;
pub use error::FieldsyncError;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use sync::{
    ConnectivityMonitor, MutationKind, MutationPayload, QueuedMutation, RemoteError,
    RemoteExecutor, SyncEngine,
};
