//! Error types for the bobsled client.

use thiserror::Error;

/// Errors that can occur when talking to the bobsled backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {path}")]
    Status { status: u16, path: String },

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend refused an action (e.g. the task is already running).
    #[error("rejected: {0}")]
    Rejected(String),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The configured origin cannot be used.
    #[error("invalid origin '{0}'")]
    InvalidOrigin(String),
}
