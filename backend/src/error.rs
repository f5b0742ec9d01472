//! Error taxonomy for the rabbitry backend.
//!
//! Every error is user-visible and recoverable; nothing here should ever
//! crash the process.

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required field is missing or malformed. The operation is aborted
    /// with no partial mutation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The persisted document could not be read or written. The operation
    /// aborts rather than proceeding with an empty document.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// An operation named an animal id that does not exist in the store.
    /// Dangling parent links in read paths are tolerated and never raise
    /// this; only explicit lookups do.
    #[error("referenced rabbit not found: {0}")]
    Reference(String),
}

/// Underlying cause of a [`AppError::Storage`] failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(StorageError::Io(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(StorageError::Malformed(err))
    }
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn reference(id: impl Into<String>) -> Self {
        AppError::Reference(id.into())
    }
}
