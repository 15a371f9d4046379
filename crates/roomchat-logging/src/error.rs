//! Error types for roomchat-logging

use thiserror::Error;

/// Errors that can occur while installing the subscriber
#[derive(Debug, Error)]
pub enum LogError {
    /// Could not prepare the log file or its directory
    #[error("failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    /// A global subscriber is already installed
    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(String),
}

/// Result type for logging setup
pub type LogResult<T> = Result<T, LogError>;
