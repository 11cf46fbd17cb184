//! Storage error type.

use crate::cursor::CursorError;
use facetdb_commons::KeyError;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors surfaced by the store. Each variant carries the underlying message.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Generic I/O error from the underlying engine
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Item or key cannot be addressed (missing key fields, NUL bytes, ...)
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Another writer modified a targeted item first; the only retryable error
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    /// Conflict retries ran out for a transaction chunk
    #[error("Transaction aborted after {attempts} conflicting attempts: {last_conflict}")]
    RetriesExhausted { attempts: u32, last_conflict: String },

    #[error("Invalid filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error("Storage error: {0}")]
    Other(String),
}

impl StorageError {
    /// Only transactional conflicts are worth retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::TransactionConflict(_))
    }
}

impl From<KeyError> for StorageError {
    fn from(err: KeyError) -> Self {
        StorageError::InvalidKey(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}
