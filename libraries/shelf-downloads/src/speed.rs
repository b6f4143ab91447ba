//! Smoothed download speed estimation

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Samples older than this are dropped
pub const SPEED_WINDOW: Duration = Duration::from_secs(30);

/// Weight of a new instant measurement in the moving average
pub const SMOOTHING_FACTOR: f64 = 0.3;

/// Speeds at or below this many bytes per second are treated as stalled
pub const MIN_ESTIMATE_SPEED: u64 = 1000;

/// Upper bound for any ETA, in seconds
pub const MAX_ETA_SECS: u64 = 86_400;

/// Per-track rolling throughput estimator
///
/// Owns the sample history and the last smoothed value of every track it
/// has seen. State for a track lives until [`SpeedEstimator::clear`].
#[derive(Debug, Default)]
pub struct SpeedEstimator {
    history: HashMap<String, VecDeque<(Instant, u64)>>,
    smoothed: HashMap<String, u64>,
}

impl SpeedEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bytes_downloaded` for `track_id` observed at `now` and
    /// return the smoothed speed in bytes per second.
    pub fn record(&mut self, track_id: &str, bytes_downloaded: u64, now: Instant) -> u64 {
        let history = self.history.entry(track_id.to_string()).or_default();

        if bytes_downloaded > 0 {
            history.push_back((now, bytes_downloaded));
        }
        history.retain(|(at, _)| now.saturating_duration_since(*at) <= SPEED_WINDOW);

        if history.len() < 2 {
            return self.smoothed(track_id);
        }
        let (old_at, old_bytes) = history[0];
        let (new_at, new_bytes) = history[history.len() - 1];

        let elapsed = new_at.saturating_duration_since(old_at).as_secs_f64();
        let instant = if elapsed > 0.0 && new_bytes >= old_bytes {
            ((new_bytes - old_bytes) as f64 / elapsed) as u64
        } else {
            0
        };

        let previous = self.smoothed.get(track_id).copied().unwrap_or(instant);
        let smoothed = if instant > 0 {
            ((1.0 - SMOOTHING_FACTOR) * previous as f64 + SMOOTHING_FACTOR * instant as f64).round()
                as u64
        } else {
            previous
        };

        self.smoothed.insert(track_id.to_string(), smoothed);
        smoothed
    }

    /// Last smoothed speed for `track_id`, 0 if none yet
    pub fn smoothed(&self, track_id: &str) -> u64 {
        self.smoothed.get(track_id).copied().unwrap_or(0)
    }

    /// Forget everything about `track_id`
    pub fn clear(&mut self, track_id: &str) {
        self.history.remove(track_id);
        self.smoothed.remove(track_id);
    }

    /// Number of tracks with retained state
    pub fn tracked(&self) -> usize {
        self.history.len().max(self.smoothed.len())
    }
}

/// Seconds to download `remaining` bytes at `speed`, clamped to
/// `[1, MAX_ETA_SECS]`; `None` when the speed is too low to estimate.
pub fn estimate_eta(remaining: u64, speed: u64) -> Option<u64> {
    (speed > MIN_ESTIMATE_SPEED).then(|| (remaining / speed).clamp(1, MAX_ETA_SECS))
}
