//! Shelf Sync Core
//!
//! Platform-agnostic core types, collaborator traits, and error handling for
//! the audiobook progress synchronization engine.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `ProgressRecord`, `AudiobookRecord`, `AudioTrack`, `Library`
//! - **Collaborator Traits**: `ProgressGateway`, `ProgressStore`, `DownloadEngine`, `Player`
//! - **Error Handling**: Unified `ShelfError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use shelf_core::types::ProgressRecord;
//!
//! let progress = ProgressRecord::new("li_123");
//! let listened = progress.with_position(42.0, 1_700_000_000_000);
//!
//! assert!(listened.pending_upload);
//! assert!(listened.last_update > progress.last_update);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Result, ShelfError};
pub use traits::{DownloadEngine, Player, ProgressGateway, ProgressStore, UpsertOutcome};

pub use types::{
    now_millis, AudioTrack, AudiobookRecord, BookMetadata, Chapter, Library, Media,
    ProgressRecord,
};
