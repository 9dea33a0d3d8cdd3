//! Offline sync: the mutation queue, flush engine, and its contracts.

pub mod connectivity;
pub mod engine;
pub mod mutation;
pub mod queue;
pub mod remote;

pub use connectivity::{ConnectivityEvents, ConnectivityMonitor};
pub use engine::{
    DiscardEvent, DiscardReason, FlushOutcome, FlushReport, FlushResult, SyncEngine,
};
pub use mutation::{MutationKind, MutationPayload, QueuedMutation};
pub use queue::{MutationQueue, QueueStats, QUEUE_KEY};
pub use remote::{RemoteError, RemoteExecutor};
