/// Core error types for Shelf Sync
use thiserror::Error;

/// Result type alias using `ShelfError`
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Core error type shared by every collaborator trait
#[derive(Error, Debug)]
pub enum ShelfError {
    /// Local storage failed; callers must not guess a merge baseline
    #[error("Storage error: {0}")]
    Storage(String),

    /// Request did not complete within its time box
    #[error("Request timed out")]
    Timeout,

    /// Server could not be reached at all
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// Server answered with a non-2xx status
    #[error("Server error ({status}): {message}")]
    Http { status: u16, message: String },

    /// Server answered but the payload could not be understood
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// No bearer token available, or the server rejected it
    #[error("Authentication required")]
    AuthRequired,

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ShelfError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Transient network failures: keep local state and retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unreachable(_))
    }
}
