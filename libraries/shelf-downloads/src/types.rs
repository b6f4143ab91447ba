//! Download progress types

use serde::{Deserialize, Serialize};

/// Download state as presented to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadState {
    Queued,
    Downloading,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl DownloadState {
    /// The track's speed history is no longer needed
    pub fn ends_transfer(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// State reported by the download engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawDownloadState {
    Queued,
    Stopped,
    Downloading,
    Completed,
    Failed,
    Removing,
    Restarting,
}

impl From<RawDownloadState> for DownloadState {
    fn from(raw: RawDownloadState) -> Self {
        match raw {
            RawDownloadState::Queued => Self::Queued,
            RawDownloadState::Stopped => Self::Paused,
            RawDownloadState::Downloading | RawDownloadState::Restarting => Self::Downloading,
            RawDownloadState::Completed => Self::Completed,
            RawDownloadState::Failed => Self::Failed,
            RawDownloadState::Removing => Self::Cancelled,
        }
    }
}

/// One state-change callback from the download engine
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadEvent {
    pub track_id: String,
    pub bytes_downloaded: u64,
    /// Content length, when the engine knows it
    pub total_bytes: Option<u64>,
    /// Percent in [0, 100], when the engine knows it
    pub percent_complete: Option<f32>,
    pub state: RawDownloadState,
}

impl DownloadEvent {
    pub fn new(
        track_id: impl Into<String>,
        bytes_downloaded: u64,
        state: RawDownloadState,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            bytes_downloaded,
            total_bytes: None,
            percent_complete: None,
            state,
        }
    }

    #[must_use]
    pub fn with_total(mut self, total_bytes: u64) -> Self {
        self.total_bytes = Some(total_bytes);
        self
    }

    #[must_use]
    pub fn with_percent(mut self, percent: f32) -> Self {
        self.percent_complete = Some(percent);
        self
    }
}

/// Derived progress of one track download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub track_id: String,
    pub bytes_downloaded: u64,
    /// Known or estimated total, 0 when unknown
    pub total_bytes: u64,
    pub percent_complete: f32,
    /// Smoothed speed in bytes per second
    pub speed: u64,
    /// Seconds remaining, `None` when speed is too low to estimate
    pub eta_secs: Option<u64>,
    pub state: DownloadState,
}

impl DownloadProgress {
    pub fn is_complete(&self) -> bool {
        self.state == DownloadState::Completed || self.percent_complete >= 100.0
    }
}

/// Byte-weighted progress across all tracks of one audiobook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudiobookDownloadProgress {
    pub audiobook_id: String,
    pub track_progresses: Vec<DownloadProgress>,
    /// Percent in [0, 100]
    pub overall_progress: f32,
    pub total_bytes_downloaded: u64,
    pub total_bytes: u64,
    /// Weighted average of active track speeds, bytes per second
    pub average_speed: u64,
    pub eta_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_state_mapping() {
        assert_eq!(DownloadState::from(RawDownloadState::Removing), DownloadState::Cancelled);
        assert_eq!(DownloadState::from(RawDownloadState::Restarting), DownloadState::Downloading);
        assert_eq!(DownloadState::from(RawDownloadState::Stopped), DownloadState::Paused);
        assert!(DownloadState::Completed.ends_transfer());
        assert!(!DownloadState::Failed.ends_transfer());
    }
}
