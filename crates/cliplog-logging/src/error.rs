//! Error types for cliplog-logging

use thiserror::Error;

/// Errors that can occur while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A level or filter directive could not be parsed
    #[error("Invalid filter: {0}")]
    Filter(String),

    /// The log directory or file could not be created
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The rolling file appender could not be built
    #[error("File appender error: {0}")]
    Appender(String),

    /// A global subscriber is already installed
    #[error("Subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}
