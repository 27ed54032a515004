//! Error types for hivesync

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a message exchange failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    #[error("No success sending the message.")]
    Rejected,

    #[error(
        "Response did not arrive within the configured wait time of {}ms",
        .0.as_millis()
    )]
    Timeout(Duration),

    #[error("Cannot wait for the response because interrupted")]
    Interrupted,
}

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Storage Errors ===
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Storage future failed: {0}")]
    FutureFailed(String),

    #[error("Put failed: {0}")]
    PutFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // === Messaging Errors ===
    #[error("Send failed: {0}")]
    SendFailed(#[from] SendFailure),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Can a higher layer reasonably retry the operation?
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::SubmissionRejected(_)
                | Error::FutureFailed(_)
                | Error::SendFailed(_)
        )
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
