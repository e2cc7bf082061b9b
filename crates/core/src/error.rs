//! Error types for testkit

use thiserror::Error;

/// Result type alias using the testkit Error
pub type Result<T> = std::result::Result<T, Error>;

/// Testkit error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Unexpected status {status} (expected one of {expected:?}): {body}")]
    StatusMismatch {
        status: u16,
        expected: Vec<u16>,
        body: String,
    },

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Unknown snapshot: {0}")]
    Snapshot(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a failed request attempt may be retried.
    ///
    /// Transport-level faults (timeouts, dispatch failures, connection
    /// hiccups) are transient; configuration and status-expectation
    /// failures are assertion-style and always surface immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::Dispatch(_) | Error::Connection(_) | Error::Http(_)
        )
    }
}
