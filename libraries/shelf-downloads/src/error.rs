/// Download errors
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DownloadError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// Audiobook has no tracks to download
    #[error("Audiobook has no tracks: {item_id}")]
    NoTracks { item_id: String },

    /// Track is neither downloaded nor streamable
    #[error("Track not available offline and no stream URL: {track_id}")]
    Unplayable { track_id: String },
}
