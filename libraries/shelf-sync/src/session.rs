//! Playback session
//!
//! Owns the in-memory copy of the audiobook being played. Every pause or
//! stop produces a new progress value, writes it through the store and
//! hands the item to the orchestrator for a best-effort upload.

use crate::error::{Result, SyncError};
use crate::events::PlaybackEvent;
use crate::orchestrator::SyncOrchestrator;
use shelf_core::types::{now_millis, AudiobookRecord};
use shelf_core::{Player, UpsertOutcome};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Playing,
    Paused,
}

pub struct PlaybackSession<P: Player> {
    record: AudiobookRecord,
    player: P,
    orchestrator: Arc<SyncOrchestrator>,
    state: SessionState,
    track_index: usize,
    events: broadcast::Sender<PlaybackEvent>,
}

impl<P: Player> PlaybackSession<P> {
    /// Load `record` into `player` at its saved position
    pub fn new(
        record: AudiobookRecord,
        mut player: P,
        orchestrator: Arc<SyncOrchestrator>,
    ) -> Self {
        let track_index = match record.track_at(record.progress.current_time) {
            Some((slot, _, offset)) => {
                player.seek(slot, offset);
                slot
            }
            None => 0,
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            record,
            player,
            orchestrator,
            state: SessionState::Stopped,
            track_index,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub fn record(&self) -> &AudiobookRecord {
        &self.record
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.send(event);
    }

    /// Position on the audiobook timeline, seconds
    pub fn position(&self) -> f64 {
        let (track_index, offset) = self.player.position();
        self.record
            .position_of(track_index, offset)
            .unwrap_or(self.record.progress.current_time)
    }

    pub fn play(&mut self) {
        if self.state == SessionState::Playing {
            return;
        }
        self.player.play();
        self.state = SessionState::Playing;
        self.emit(PlaybackEvent::Playing {
            item_id: self.record.id.clone(),
        });
    }

    /// Pause and persist the position
    pub async fn pause(&mut self) -> Result<()> {
        if self.state != SessionState::Playing {
            return Ok(());
        }
        self.player.pause();
        self.state = SessionState::Paused;

        self.save_progress().await?;
        self.emit(PlaybackEvent::Paused {
            item_id: self.record.id.clone(),
            position: self.record.progress.current_time,
        });
        Ok(())
    }

    /// Stop and persist the position
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == SessionState::Stopped {
            return Ok(());
        }
        if self.state == SessionState::Playing {
            self.player.pause();
        }
        self.state = SessionState::Stopped;

        self.save_progress().await?;
        self.emit(PlaybackEvent::Stopped {
            item_id: self.record.id.clone(),
            position: self.record.progress.current_time,
        });
        Ok(())
    }

    /// Seek on the audiobook timeline
    pub fn seek_to(&mut self, position: f64) {
        let Some((slot, track, offset)) = self.record.track_at(position) else {
            warn!(item_id = %self.record.id, "Cannot seek, audiobook has no tracks");
            return;
        };
        let global = track.start_offset + offset;
        self.player.seek(slot, offset);
        self.notify_track_changed(slot);

        self.emit(PlaybackEvent::PositionChanged {
            item_id: self.record.id.clone(),
            position: global,
            duration: self.record.media.duration,
        });
    }

    /// Player moved to the track in slot `track_index` of `media.tracks`,
    /// on its own or through a seek
    pub fn notify_track_changed(&mut self, track_index: usize) {
        if track_index == self.track_index {
            return;
        }
        self.track_index = track_index;

        let chapter = self
            .record
            .position_of(track_index, 0.0)
            .and_then(|start| self.record.chapter_at(start))
            .map(|c| c.title.clone());
        debug!(item_id = %self.record.id, track_index, "Track changed");
        self.emit(PlaybackEvent::TrackChanged {
            item_id: self.record.id.clone(),
            track_index,
            chapter,
        });
    }

    /// Player stalled waiting for audio data
    pub fn notify_buffering(&self) {
        self.emit(PlaybackEvent::Buffering {
            item_id: self.record.id.clone(),
        });
    }

    /// Write the current position locally, then try to upload it.
    ///
    /// Only a local storage failure is an error; upload problems leave the
    /// record pending for the next trigger.
    pub async fn save_progress(&mut self) -> Result<()> {
        let progress = self.record.progress.with_position(self.position(), now_millis());
        let updated = self.record.with_progress(progress);

        let store = self.orchestrator.store();
        match store.upsert(&updated).await.map_err(SyncError::Storage)? {
            UpsertOutcome::Applied => self.record = updated,
            UpsertOutcome::Rejected => {
                // Stored copy is newer; follow it
                let stored = store
                    .get_by_id(&self.record.id)
                    .await
                    .map_err(SyncError::Storage)?;
                if let Some(stored) = stored {
                    self.record = stored;
                }
            }
        }

        info!(
            item_id = %self.record.id,
            current_time = self.record.progress.current_time,
            last_update = self.record.progress.last_update,
            "Progress saved"
        );
        self.emit(PlaybackEvent::ProgressSaved {
            item_id: self.record.id.clone(),
            current_time: self.record.progress.current_time,
            last_update: self.record.progress.last_update,
        });

        match self.orchestrator.sync_item(&self.record.id).await {
            Ok(outcome) => debug!(item_id = %self.record.id, ?outcome, "Synced after save"),
            Err(e) => warn!(item_id = %self.record.id, error = %e, "Sync after save failed"),
        }

        // Pick up the pending flag and any adopted server position
        let stored = store
            .get_by_id(&self.record.id)
            .await
            .map_err(SyncError::Storage)?;
        if let Some(stored) = stored {
            self.record = stored;
        }
        Ok(())
    }
}
