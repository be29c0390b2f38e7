//! Error types for cliplog-history

use cliplog_storage::{EntryId, StorageError};
use thiserror::Error;

/// Errors that can occur while managing clipboard history
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The underlying log failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// No live entry has this id
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    /// The configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HistoryError {
    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<toml::de::Error> for HistoryError {
    fn from(err: toml::de::Error) -> Self {
        HistoryError::Config(err.to_string())
    }
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;
