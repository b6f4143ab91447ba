mod audiobook;
mod library;
mod progress;

pub use audiobook::{AudioTrack, AudiobookRecord, BookMetadata, Chapter, Media};
pub use library::Library;
pub use progress::ProgressRecord;

/// Current wall-clock time in epoch milliseconds.
///
/// This is the clock used for `ProgressRecord::last_update`.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
