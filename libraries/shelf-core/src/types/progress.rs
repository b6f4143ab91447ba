/// Playback progress for one audiobook
use serde::{Deserialize, Serialize};

/// One audiobook's playback state, timestamped for conflict resolution.
///
/// Records are values: every change produces a new record through one of the
/// `with_*` constructors, so a playback session and an observer holding the
/// same audiobook never alias a mutable sub-record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Audiobook this progress belongs to
    pub item_id: String,

    /// Position in seconds within the concatenated track timeline
    pub current_time: f64,

    /// Epoch millis of the last change; the only merge ordering key
    pub last_update: i64,

    /// Total duration in seconds (informational)
    pub duration: f64,

    /// Completion fraction between 0.0 and 1.0 (informational)
    pub progress: f64,

    /// Whether the book was finished (informational)
    pub is_finished: bool,

    /// Epoch millis when listening started, 0 if never
    pub started_at: i64,

    /// Epoch millis when the book was finished
    pub finished_at: Option<i64>,

    /// Local value not yet confirmed written to the server
    pub pending_upload: bool,
}

impl ProgressRecord {
    /// Empty progress for an item that has never been played.
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            current_time: 0.0,
            last_update: 0,
            duration: 0.0,
            progress: 0.0,
            is_finished: false,
            started_at: 0,
            finished_at: None,
            pending_upload: false,
        }
    }

    /// New record for a local playback position change.
    ///
    /// `last_update` strictly increases even if the wall clock stalls or
    /// steps backwards, and the result is always pending upload.
    #[must_use]
    pub fn with_position(&self, current_time: f64, now_ms: i64) -> Self {
        let current_time = current_time.max(0.0);
        let progress = if self.duration > 0.0 {
            (current_time / self.duration).clamp(0.0, 1.0)
        } else {
            self.progress
        };

        Self {
            current_time,
            last_update: now_ms.max(self.last_update.saturating_add(1)),
            progress,
            started_at: if self.started_at == 0 {
                now_ms
            } else {
                self.started_at
            },
            pending_upload: true,
            ..self.clone()
        }
    }

    /// Same record with the pending flag set to `pending`.
    #[must_use]
    pub fn with_pending(&self, pending: bool) -> Self {
        Self {
            pending_upload: pending,
            ..self.clone()
        }
    }

    /// Same record, confirmed on the server.
    #[must_use]
    pub fn synced(&self) -> Self {
        self.with_pending(false)
    }

    /// Two records describe the same state iff their `last_update` match.
    pub fn same_state(&self, other: &Self) -> bool {
        self.last_update == other.last_update
    }

    /// Strictly newer than `other` by `last_update`.
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.last_update > other.last_update
    }
}
