//! Error types for cliplog-storage
//!
//! Damaged log contents are never an error: replay stops at the first bad
//! record and keeps what it has. Only I/O and writer failures surface here.

use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("I/O error: {0}")]
    Io(String),

    /// The background log writer has shut down
    #[error("Log writer is closed")]
    WriterClosed,
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl StorageError {
    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }
}
