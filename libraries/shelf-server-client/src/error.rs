//! Error types for the server client.

use shelf_core::ShelfError;
use thiserror::Error;

/// Errors that can occur when talking to the audiobook server.
#[derive(Error, Debug)]
pub enum ServerClientError {
    /// HTTP request failed for a reason other than timeout or connection
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned a non-2xx response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// No token available, or the server rejected it
    #[error("Authentication required")]
    AuthRequired,

    /// Login rejected
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
}

impl ServerClientError {
    /// Classify a transport error from `reqwest`.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ServerUnreachable(err.to_string())
        } else {
            Self::Request(err)
        }
    }
}

impl From<ServerClientError> for ShelfError {
    fn from(err: ServerClientError) -> Self {
        match err {
            ServerClientError::Timeout => ShelfError::Timeout,
            ServerClientError::ServerUnreachable(msg) => ShelfError::Unreachable(msg),
            ServerClientError::Request(e) => ShelfError::Unreachable(e.to_string()),
            ServerClientError::ServerError { status, message } => {
                ShelfError::Http { status, message }
            }
            ServerClientError::ParseError(msg) => ShelfError::MalformedPayload(msg),
            ServerClientError::AuthRequired | ServerClientError::AuthFailed(_) => {
                ShelfError::AuthRequired
            }
            ServerClientError::InvalidUrl(msg) => ShelfError::InvalidInput(msg),
        }
    }
}

/// Result type for server client operations.
pub type Result<T> = std::result::Result<T, ServerClientError>;
