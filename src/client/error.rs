//! Client sync error types.

use thiserror::Error;

/// Errors surfaced by the API client and cache store.
///
/// None of these reach the host page: the controller logs and swallows them.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx HTTP status.
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    /// The server answered `success: false`.
    #[error("server reported failure: {0}")]
    Server(String),

    /// Body was not the expected JSON.
    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local cache could not be written.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for client sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
