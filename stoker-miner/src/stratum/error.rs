//! Error types for the Stratum v1 protocol.

use thiserror::Error;

/// Stratum protocol errors.
#[derive(Error, Debug)]
pub enum StratumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed message from the pool. Fatal during the handshake, logged
    /// and skipped in the session loop.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Unexpected response to {0}")]
    UnexpectedResponse(String),

    #[error("Connection lost")]
    Disconnected,

    #[error("Timeout waiting for response")]
    Timeout,
}

/// Convenient Result type for Stratum operations.
pub type StratumResult<T> = Result<T, StratumError>;
