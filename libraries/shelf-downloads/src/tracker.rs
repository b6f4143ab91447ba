//! Download progress tracker
//!
//! Turns raw download-engine callbacks into [`DownloadProgress`] values and
//! publishes them on a last-value channel. Observers that join late see the
//! most recent value; slow observers may skip intermediate ones, which is
//! fine because aggregation is recomputed from current state.

use crate::aggregate::aggregate;
use crate::speed::{estimate_eta, SpeedEstimator};
use crate::types::{AudiobookDownloadProgress, DownloadEvent, DownloadProgress, DownloadState};
use shelf_core::types::AudiobookRecord;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info};

/// Tracks per-track download progress
pub struct DownloadProgressTracker {
    estimator: Mutex<SpeedEstimator>,
    latest: Mutex<HashMap<String, DownloadProgress>>,
    sender: watch::Sender<Option<DownloadProgress>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for DownloadProgressTracker {
    fn default() -> Self {
        Self::new(SpeedEstimator::new())
    }
}

impl DownloadProgressTracker {
    pub fn new(estimator: SpeedEstimator) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            estimator: Mutex::new(estimator),
            latest: Mutex::new(HashMap::new()),
            sender,
        }
    }

    /// Subscribe to progress updates; the last emitted value is visible
    /// immediately through `borrow()`.
    pub fn subscribe(&self) -> watch::Receiver<Option<DownloadProgress>> {
        self.sender.subscribe()
    }

    /// Handle an engine callback observed now.
    pub fn on_download_changed(&self, event: DownloadEvent) -> DownloadProgress {
        self.on_download_changed_at(event, Instant::now())
    }

    /// Handle an engine callback observed at `now`.
    pub fn on_download_changed_at(&self, event: DownloadEvent, now: Instant) -> DownloadProgress {
        let state = DownloadState::from(event.state);
        let percent = event.percent_complete.unwrap_or(0.0).clamp(0.0, 100.0);

        let total_bytes = match event.total_bytes {
            Some(total) => total,
            None if percent > 0.0 => {
                (event.bytes_downloaded as f64 / (f64::from(percent) / 100.0)) as u64
            }
            None => 0,
        };
        let percent_complete = match event.percent_complete {
            Some(_) => percent,
            None if total_bytes > 0 => {
                (event.bytes_downloaded as f64 / total_bytes as f64 * 100.0).min(100.0) as f32
            }
            None => 0.0,
        };

        let speed = {
            let mut estimator = lock(&self.estimator);
            let speed = estimator.record(&event.track_id, event.bytes_downloaded, now);
            if state.ends_transfer() {
                estimator.clear(&event.track_id);
            }
            speed
        };
        let eta_secs = estimate_eta(total_bytes.saturating_sub(event.bytes_downloaded), speed);

        let progress = DownloadProgress {
            track_id: event.track_id,
            bytes_downloaded: event.bytes_downloaded,
            total_bytes,
            percent_complete,
            speed,
            eta_secs,
            state,
        };

        debug!(
            track_id = %progress.track_id,
            state = ?progress.state,
            bytes = progress.bytes_downloaded,
            total = progress.total_bytes,
            speed = progress.speed,
            eta = ?progress.eta_secs,
            "Download progress"
        );
        if state == DownloadState::Completed {
            info!(track_id = %progress.track_id, "Download completed");
        }

        if state == DownloadState::Cancelled {
            lock(&self.latest).remove(&progress.track_id);
        } else {
            lock(&self.latest).insert(progress.track_id.clone(), progress.clone());
        }
        self.sender.send_replace(Some(progress.clone()));

        progress
    }

    /// The engine dropped a download entirely.
    pub fn on_download_removed(&self, track_id: &str) {
        debug!(track_id = %track_id, "Download removed");
        self.clear(track_id);
    }

    /// Discard all state for `track_id`.
    pub fn clear(&self, track_id: &str) {
        lock(&self.estimator).clear(track_id);
        lock(&self.latest).remove(track_id);
    }

    /// Latest progress for one track.
    pub fn progress_for(&self, track_id: &str) -> Option<DownloadProgress> {
        lock(&self.latest).get(track_id).cloned()
    }

    /// Aggregate the latest progress of every track of `record`.
    pub fn audiobook_progress(&self, record: &AudiobookRecord) -> AudiobookDownloadProgress {
        let tracks: Vec<DownloadProgress> = {
            let latest = lock(&self.latest);
            record
                .media
                .tracks
                .iter()
                .filter_map(|t| latest.get(t.id()).cloned())
                .collect()
        };

        aggregate(&record.id, record.media.tracks.len(), &tracks)
    }

    /// Number of tracks with retained speed state.
    pub fn tracked_speed_states(&self) -> usize {
        lock(&self.estimator).tracked()
    }
}
