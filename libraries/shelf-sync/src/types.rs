use serde::{Deserialize, Serialize};
use shelf_core::types::AudiobookRecord;
use std::time::Duration;

/// Per-audiobook sync state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Reconciling,
    /// Local progress is newer than anything confirmed on the server
    UploadPending,
}

/// Result of syncing one audiobook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Server copy was at least as new and replaced the local one
    AdoptedRemote,
    /// Local copy was newer and the server confirmed the upload
    Uploaded,
    /// Local copy was newer but the upload failed; it stays pending
    UploadFailed(String),
    /// Server could not be asked; local state untouched
    RemoteUnavailable(String),
    /// A newer local write landed while syncing; it stays pending
    Superseded,
}

impl SyncOutcome {
    /// Item needs no further work
    pub fn is_success(&self) -> bool {
        matches!(self, Self::AdoptedRemote | Self::Uploaded)
    }
}

/// Contract with the background scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchResult {
    /// Every pending item is settled
    Success,
    /// Something is still pending; run again later
    Retry,
}

/// Whether the server took part in opening an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Reconciled,
    /// Showing the local copy only
    Unavailable(String),
}

/// Item ready for playback
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedItem {
    pub record: AudiobookRecord,
    pub remote: RemoteStatus,
}

/// Events broadcast by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncEvent {
    StateChanged { item_id: String, state: SyncState },
    ItemSynced { item_id: String, outcome: SyncOutcome },
    BatchFinished {
        result: BatchResult,
        succeeded: usize,
        total: usize,
    },
}

/// Sync engine configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound for a single fetch or upload, on top of the HTTP timeout
    pub request_timeout: Duration,
    /// How often the periodic sync runs
    pub periodic_interval: Duration,
    /// Retries of a failed periodic batch before waiting for the next tick
    pub backoff_retries: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            periodic_interval: Duration::from_secs(15 * 60),
            backoff_retries: 4,
            backoff_min: Duration::from_secs(10),
            backoff_max: Duration::from_secs(5 * 60),
        }
    }
}
