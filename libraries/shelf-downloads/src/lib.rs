//! Shelf Sync Downloads
//!
//! Observes a black-box download engine and derives what the UI shows:
//! smoothed speed, ETA, and byte-weighted audiobook progress.
//!
//! # Example
//!
//! ```rust
//! use shelf_downloads::{DownloadEvent, DownloadProgressTracker, RawDownloadState};
//!
//! let tracker = DownloadProgressTracker::default();
//! let updates = tracker.subscribe();
//!
//! tracker.on_download_changed(
//!     DownloadEvent::new("/s/item/li_1/part1.mp3", 500, RawDownloadState::Downloading)
//!         .with_total(1000),
//! );
//!
//! let latest = updates.borrow().clone().unwrap();
//! assert_eq!(latest.percent_complete, 50.0);
//! ```

mod aggregate;
mod coordinator;
mod error;
mod format;
mod speed;
mod tracker;
mod types;

pub use aggregate::aggregate;
pub use coordinator::{DownloadCoordinator, PlaybackSource};
pub use error::{DownloadError, Result};
pub use format::{format_bytes, format_eta};
pub use speed::{estimate_eta, SpeedEstimator, MAX_ETA_SECS, MIN_ESTIMATE_SPEED, SPEED_WINDOW};
pub use tracker::DownloadProgressTracker;
pub use types::{
    AudiobookDownloadProgress, DownloadEvent, DownloadProgress, DownloadState, RawDownloadState,
};
