//! Types for the audiobook server API requests and responses.

use serde::{Deserialize, Serialize};
use shelf_core::types::{
    AudioTrack, AudiobookRecord, BookMetadata, Chapter, Library, Media, ProgressRecord,
};
use std::time::Duration;

/// Per-request timeout: short in debug builds so failures surface quickly.
pub fn default_timeout() -> Duration {
    if cfg!(debug_assertions) {
        Duration::from_secs(3)
    } else {
        Duration::from_secs(7)
    }
}

/// Configuration for connecting to an audiobook server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the server (e.g., "https://abs.example.com")
    pub url: String,
    /// Bearer token (if authenticated)
    pub token: Option<String>,
    /// Connect/read/write timeout per request
    pub timeout: Duration,
}

impl ServerConfig {
    /// Create a new server config with just the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            timeout: default_timeout(),
        }
    }

    /// Create a config with an existing token.
    pub fn with_token(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::new(url)
        }
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// Authentication Types
// =============================================================================

/// Request body for `POST /login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response from successful login.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub user: UserInfo,
}

/// Logged in user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub token: String,
}

// =============================================================================
// Library Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct LibrariesResponse {
    pub libraries: Vec<ServerLibrary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LibraryItemsResponse {
    pub results: Vec<ServerLibraryItem>,
}

/// Library as returned by `GET /api/libraries`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerLibrary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub display_order: i32,
}

impl From<ServerLibrary> for Library {
    fn from(lib: ServerLibrary) -> Self {
        Self {
            id: lib.id,
            name: lib.name,
            media_type: lib.media_type,
            display_order: lib.display_order,
        }
    }
}

// =============================================================================
// Item Types
// =============================================================================

/// Library item as returned by the items endpoints.
///
/// Only the fields the engine uses are decoded; the server sends many more.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerLibraryItem {
    pub id: String,
    #[serde(default)]
    pub library_id: String,
    #[serde(default)]
    pub media: ServerMedia,
    #[serde(default)]
    pub user_media_progress: Option<ServerProgress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMedia {
    #[serde(default)]
    pub metadata: ServerMetadata,
    #[serde(default)]
    pub tracks: Vec<ServerTrack>,
    #[serde(default)]
    pub chapters: Vec<ServerChapter>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author_name: String,
    pub narrator_name: Option<String>,
    pub series_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTrack {
    pub index: u32,
    #[serde(default)]
    pub start_offset: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub title: String,
    pub content_url: String,
    #[serde(default)]
    pub mime_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerChapter {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub title: String,
}

/// `userMediaProgress` object embedded in an item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProgress {
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub is_finished: bool,
    pub last_update: i64,
    #[serde(default)]
    pub started_at: i64,
    pub finished_at: Option<i64>,
}

impl ServerLibraryItem {
    /// Convert into the engine's record; server progress is never pending.
    pub fn into_record(self) -> AudiobookRecord {
        let media = Media {
            metadata: BookMetadata {
                title: self.media.metadata.title,
                author_name: self.media.metadata.author_name,
                narrator_name: self.media.metadata.narrator_name,
                series_name: self.media.metadata.series_name,
                description: self.media.metadata.description,
            },
            tracks: self
                .media
                .tracks
                .into_iter()
                .map(|t| AudioTrack {
                    index: t.index,
                    start_offset: t.start_offset,
                    duration: t.duration,
                    title: t.title,
                    content_url: t.content_url,
                    mime_type: t.mime_type,
                })
                .collect(),
            chapters: self
                .media
                .chapters
                .into_iter()
                .map(|c| Chapter {
                    id: c.id,
                    start: c.start,
                    end: c.end,
                    title: c.title,
                })
                .collect(),
            duration: self.media.duration,
            size: self.media.size,
        };

        let record = AudiobookRecord::new(self.id, self.library_id, media);
        match self.user_media_progress {
            Some(p) => {
                let progress = ProgressRecord {
                    item_id: record.id.clone(),
                    current_time: p.current_time,
                    last_update: p.last_update,
                    duration: p.duration,
                    progress: p.progress,
                    is_finished: p.is_finished,
                    started_at: p.started_at,
                    finished_at: p.finished_at,
                    pending_upload: false,
                };
                record.with_progress(progress)
            }
            None => record,
        }
    }
}

// =============================================================================
// Progress Types
// =============================================================================

/// Request body for `PATCH /api/me/progress/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub current_time: f64,
    pub last_update: i64,
}
