//! Error types for fieldsync.

use thiserror::Error;

/// Errors returned by fieldsync operations.
#[derive(Debug, Error)]
pub enum FieldsyncError {
    /// Persistent store could not be opened, read, or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialized state could not be encoded or decoded.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A requested item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}
