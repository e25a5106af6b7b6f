//! Error types for the authority engine

use thiserror::Error;

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict (e.g., already exists)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Backing store failure
    #[error("Storage failure: {0}")]
    Backend(String),
}

/// Engine-level errors, mirroring the operation taxonomy: malformed input,
/// missing entity, failed predicate, shutdown gate, store failure.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input; operation not attempted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity absent; no mutation occurred
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authorization predicate false
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Site shutdown is active; only HQ may access
    #[error("Site shutdown active. Only HQ may access.")]
    ShutdownActive,

    /// Backing store error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for engine operations
pub type CoreResult<T> = Result<T, CoreError>;
