/// Audiobook (library item) types
use super::ProgressRecord;
use serde::{Deserialize, Serialize};

/// Static book metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    pub author_name: String,
    pub narrator_name: Option<String>,
    pub series_name: Option<String>,
    pub description: Option<String>,
}

/// One audio file of a book, placed on the concatenated timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub index: u32,
    /// Seconds from the start of the book where this track begins
    pub start_offset: f64,
    pub duration: f64,
    pub title: String,
    /// Server-relative URL; also the track's identity for downloads
    pub content_url: String,
    pub mime_type: String,
}

impl AudioTrack {
    /// Track identity used by the download engine
    pub fn id(&self) -> &str {
        &self.content_url
    }

    /// Seconds from the start of the book where this track ends
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration
    }
}

/// A chapter marker on the book timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub title: String,
}

/// Everything playable about a book
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub metadata: BookMetadata,
    pub tracks: Vec<AudioTrack>,
    pub chapters: Vec<Chapter>,
    /// Total duration in seconds
    pub duration: f64,
    /// Total size in bytes
    pub size: u64,
}

/// One library item with its embedded progress (1:1, same lifecycle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudiobookRecord {
    pub id: String,
    pub library_id: String,
    pub media: Media,
    pub progress: ProgressRecord,
}

impl AudiobookRecord {
    /// New record with no progress yet.
    pub fn new(id: impl Into<String>, library_id: impl Into<String>, media: Media) -> Self {
        let id = id.into();
        let mut progress = ProgressRecord::new(id.clone());
        progress.duration = media.duration;
        Self {
            id,
            library_id: library_id.into(),
            media,
            progress,
        }
    }

    /// Same item carrying `progress` instead.
    #[must_use]
    pub fn with_progress(&self, progress: ProgressRecord) -> Self {
        Self {
            progress,
            ..self.clone()
        }
    }

    pub fn title(&self) -> &str {
        &self.media.metadata.title
    }

    pub fn author(&self) -> &str {
        &self.media.metadata.author_name
    }

    /// Track containing `position`, its slot in `media.tracks`, and the
    /// offset within it.
    ///
    /// The slot is what players address; `AudioTrack::index` is the server's
    /// numbering and may start at 1. Positions before the first track map to
    /// its start, positions past the end map to the end of the last track.
    /// `None` only for a book without tracks.
    pub fn track_at(&self, position: f64) -> Option<(usize, &AudioTrack, f64)> {
        let position = position.max(0.0);
        let (slot, track) = self
            .media
            .tracks
            .iter()
            .enumerate()
            .rev()
            .find(|(_, t)| t.start_offset <= position)
            .or_else(|| self.media.tracks.first().map(|t| (0, t)))?;

        let offset = (position - track.start_offset).clamp(0.0, track.duration.max(0.0));
        Some((slot, track, offset))
    }

    /// Timeline position for `offset` seconds into the track in `slot`.
    pub fn position_of(&self, slot: usize, offset: f64) -> Option<f64> {
        self.media
            .tracks
            .get(slot)
            .map(|t| t.start_offset + offset.max(0.0))
    }

    /// Chapter containing `position`
    pub fn chapter_at(&self, position: f64) -> Option<&Chapter> {
        self.media
            .chapters
            .iter()
            .find(|c| c.start <= position && position < c.end)
    }
}
