//! Audiobook-level download commands

use crate::error::{DownloadError, Result};
use crate::tracker::DownloadProgressTracker;
use shelf_core::types::{AudioTrack, AudiobookRecord};
use shelf_core::DownloadEngine;
use std::sync::Arc;
use tracing::info;

/// Where a track should be played from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    /// Fully downloaded; play from the engine's cache by track id
    Local(String),
    /// Stream from the server
    Stream(String),
}

/// Issues download commands for whole audiobooks
pub struct DownloadCoordinator {
    engine: Arc<dyn DownloadEngine>,
    tracker: Arc<DownloadProgressTracker>,
}

impl DownloadCoordinator {
    pub fn new(engine: Arc<dyn DownloadEngine>, tracker: Arc<DownloadProgressTracker>) -> Self {
        Self { engine, tracker }
    }

    pub fn tracker(&self) -> &Arc<DownloadProgressTracker> {
        &self.tracker
    }

    /// Queue every track of `record` that is not already downloaded or in
    /// flight. Returns the number of tracks queued.
    pub fn download_audiobook<F>(&self, record: &AudiobookRecord, url_for: F) -> Result<usize>
    where
        F: Fn(&AudioTrack) -> String,
    {
        if record.media.tracks.is_empty() {
            return Err(DownloadError::NoTracks {
                item_id: record.id.clone(),
            });
        }

        let mut queued = 0;
        for track in &record.media.tracks {
            let id = track.id();
            if self.engine.is_downloaded(id) || self.engine.is_downloading(id) {
                continue;
            }
            self.engine.request_add(id, &url_for(track));
            queued += 1;
        }

        info!(item_id = %record.id, queued, "Queued audiobook download");
        Ok(queued)
    }

    /// Remove every track of `record` and drop its tracked progress.
    pub fn remove_audiobook(&self, record: &AudiobookRecord) {
        for track in &record.media.tracks {
            self.engine.request_remove(track.id());
            self.tracker.clear(track.id());
        }
        info!(item_id = %record.id, "Removed audiobook download");
    }

    /// All tracks downloaded. A book without tracks is never downloaded.
    pub fn is_audiobook_downloaded(&self, record: &AudiobookRecord) -> bool {
        !record.media.tracks.is_empty()
            && record
                .media
                .tracks
                .iter()
                .all(|t| self.engine.is_downloaded(t.id()))
    }

    /// Pick local playback when the track is downloaded, else stream.
    pub fn playback_source(
        &self,
        track: &AudioTrack,
        stream_url: Option<String>,
    ) -> Result<PlaybackSource> {
        if self.engine.is_downloaded(track.id()) {
            return Ok(PlaybackSource::Local(track.id().to_string()));
        }

        stream_url
            .map(PlaybackSource::Stream)
            .ok_or_else(|| DownloadError::Unplayable {
                track_id: track.id().to_string(),
            })
    }
}
