/// Collaborator traits consumed by the sync engine
use crate::error::Result;
use crate::types::AudiobookRecord;
use async_trait::async_trait;

/// Outcome of a merge-aware write to the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Record was inserted, or replaced a record that was not newer
    Applied,
    /// Stored record has a greater `last_update`; incoming write dropped
    Rejected,
}

impl UpsertOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Remote progress gateway
///
/// Stateless request/response wrapper around the audiobook server. It never
/// decides anything; the reconciler does.
#[async_trait]
pub trait ProgressGateway: Send + Sync {
    /// Fetch one item with the server's progress embedded.
    ///
    /// The embedded progress always has `pending_upload == false`.
    async fn fetch_item(&self, item_id: &str) -> Result<AudiobookRecord>;

    /// Push a playback position to the server.
    async fn patch_progress(&self, item_id: &str, current_time: f64, last_update: i64)
        -> Result<()>;
}

/// Durable keyed store of audiobook records
///
/// Implementations must make `upsert` the arbiter for concurrent writers:
/// a write never regresses `last_update` for an item.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Point lookup.
    async fn get_by_id(&self, item_id: &str) -> Result<Option<AudiobookRecord>>;

    /// Merge-aware write. Rejected when the stored `last_update` is greater.
    async fn upsert(&self, record: &AudiobookRecord) -> Result<UpsertOutcome>;

    /// All records awaiting upload, most recent `last_update` first.
    async fn list_pending_upload(&self) -> Result<Vec<AudiobookRecord>>;

    /// Clear the pending flag for one record without touching anything else.
    async fn mark_synced(&self, item_id: &str) -> Result<()>;

    /// Clear the pending flag only if the stored `last_update` still equals
    /// the value that was uploaded. Returns whether the flag was cleared.
    async fn mark_synced_at(&self, item_id: &str, last_update: i64) -> Result<bool>;
}

/// Black-box download engine keyed by track id
///
/// The engine reports state changes through its own callback mechanism;
/// those callbacks are fed into the download tracker.
pub trait DownloadEngine: Send + Sync {
    fn is_downloaded(&self, track_id: &str) -> bool;

    fn is_downloading(&self, track_id: &str) -> bool;

    /// Queue a download. Adding an already known track is a no-op.
    fn request_add(&self, track_id: &str, url: &str);

    /// Remove a download and its cached bytes.
    fn request_remove(&self, track_id: &str);
}

/// Black-box audio player
///
/// Positions are per track; mapping to the concatenated audiobook timeline
/// is done by the playback session.
pub trait Player: Send {
    fn play(&mut self);

    fn pause(&mut self);

    /// Seek to `offset` seconds within the track at `track_index` in
    /// `media.tracks` (a slot, not the server's track number).
    fn seek(&mut self, track_index: usize, offset: f64);

    /// Current `(track_index, offset_seconds)`.
    fn position(&self) -> (usize, f64);

    /// Duration of the current track in seconds, if known.
    fn duration(&self) -> Option<f64>;
}
