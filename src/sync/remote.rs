//! Contract for executing mutations against the remote store.

use async_trait::async_trait;
use thiserror::Error;

use super::mutation::QueuedMutation;

/// A classified remote execution failure.
///
/// The classification drives the retry policy: transient failures are
/// retried up to the attempt ceiling, permanent failures are discarded
/// immediately so the retry budget is not spent on attempts that cannot
/// succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network error, timeout, or 5xx-equivalent; worth retrying.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// Validation rejection, 4xx-equivalent, or conflict; retrying cannot
    /// succeed.
    #[error("permanent remote failure: {0}")]
    Permanent(String),
}

impl RemoteError {
    /// Whether a retry may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Executes a single mutation against whatever remote store is configured
/// (a hosted database, REST API, ...).
///
/// Implementations own their timeout policy and report a timeout as
/// [`RemoteError::Transient`]. Upsert semantics are preferred for Create
/// so that retrying a partially-succeeded attempt does not corrupt state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Apply the mutation to the remote store.
    ///
    /// # Errors
    ///
    /// Returns a classified [`RemoteError`] on failure.
    async fn execute(&self, mutation: &QueuedMutation) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(RemoteError::Transient("connection reset".to_string()).is_transient());
        assert!(!RemoteError::Permanent("validation failed".to_string()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = RemoteError::Transient("timeout after 10s".to_string());
        assert_eq!(err.to_string(), "transient remote failure: timeout after 10s");
    }
}
