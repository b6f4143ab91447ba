//! Playback Events
//!
//! Typed events published by a [`PlaybackSession`](crate::PlaybackSession)
//! for UI and notification observers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    Playing {
        item_id: String,
    },

    Paused {
        item_id: String,
        /// Position on the audiobook timeline, seconds
        position: f64,
    },

    Stopped {
        item_id: String,
        position: f64,
    },

    /// Player is waiting for data (stream or partially downloaded track)
    Buffering {
        item_id: String,
    },

    /// Position moved by a seek
    PositionChanged {
        item_id: String,
        position: f64,
        duration: f64,
    },

    /// Playback moved to another track of the same audiobook
    TrackChanged {
        item_id: String,
        track_index: usize,
        chapter: Option<String>,
    },

    /// Progress was written to the local store
    ProgressSaved {
        item_id: String,
        current_time: f64,
        last_update: i64,
    },
}
