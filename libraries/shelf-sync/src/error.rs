use shelf_core::ShelfError;
use thiserror::Error;

/// Errors that can occur during sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// Local store failed; nothing is merged against a guessed baseline
    #[error("Storage error: {0}")]
    Storage(#[source] ShelfError),

    /// Item is neither cached locally nor reachable on the server
    #[error("Item {item_id} unavailable: {reason}")]
    ItemUnavailable { item_id: String, reason: String },

    #[error("Item not cached locally: {0}")]
    NotCached(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
