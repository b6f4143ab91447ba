//! Audiobook-level download progress

use crate::speed::{MAX_ETA_SECS, MIN_ESTIMATE_SPEED};
use crate::types::{AudiobookDownloadProgress, DownloadProgress};

/// Aggregate ETA is padded by this factor
const ETA_BUFFER: f64 = 1.1;

/// Combine the current progress of an audiobook's tracks.
///
/// `total_track_count` is the number of tracks the audiobook has, used for
/// the completed-track fallback when no byte totals are known. The result
/// only depends on the values passed in, so it can be recomputed from the
/// latest per-track state at any time.
pub fn aggregate(
    audiobook_id: &str,
    total_track_count: usize,
    tracks: &[DownloadProgress],
) -> AudiobookDownloadProgress {
    if tracks.is_empty() {
        return AudiobookDownloadProgress {
            audiobook_id: audiobook_id.to_string(),
            track_progresses: Vec::new(),
            overall_progress: 0.0,
            total_bytes_downloaded: 0,
            total_bytes: 0,
            average_speed: 0,
            eta_secs: None,
        };
    }

    let total_bytes_downloaded: u64 = tracks.iter().map(|t| t.bytes_downloaded).sum();
    let total_bytes: u64 = tracks.iter().map(|t| t.total_bytes).sum();

    let overall = if total_bytes > 0 {
        total_bytes_downloaded as f64 / total_bytes as f64 * 100.0
    } else if total_track_count > 0 {
        let completed = tracks.iter().filter(|t| t.is_complete()).count();
        completed as f64 / total_track_count as f64 * 100.0
    } else {
        0.0
    };
    let overall_progress = overall.clamp(0.0, 100.0) as f32;

    let average_speed = weighted_speed(tracks);

    let remaining = total_bytes.saturating_sub(total_bytes_downloaded);
    let eta_secs = (average_speed > MIN_ESTIMATE_SPEED && remaining > 0).then(|| {
        let seconds = (remaining / average_speed) as f64 * ETA_BUFFER;
        (seconds as u64).clamp(1, MAX_ETA_SECS)
    });

    tracing::trace!(
        audiobook_id = %audiobook_id,
        tracks = tracks.len(),
        total_bytes,
        downloaded = total_bytes_downloaded,
        progress = overall_progress,
        speed = average_speed,
        eta = ?eta_secs,
        "Aggregated audiobook download progress"
    );

    AudiobookDownloadProgress {
        audiobook_id: audiobook_id.to_string(),
        track_progresses: tracks.to_vec(),
        overall_progress,
        total_bytes_downloaded,
        total_bytes,
        average_speed,
        eta_secs,
    }
}

/// Average speed of active tracks weighted by bytes downloaded (floor 1)
fn weighted_speed(tracks: &[DownloadProgress]) -> u64 {
    let (weighted, weight) = tracks
        .iter()
        .filter(|t| t.speed > MIN_ESTIMATE_SPEED)
        .fold((0_u128, 0_u128), |(sum, weight), t| {
            let w = u128::from(t.bytes_downloaded.max(1));
            (sum + u128::from(t.speed) * w, weight + w)
        });

    if weight == 0 {
        0
    } else {
        u64::try_from(weighted / weight).unwrap_or(u64::MAX)
    }
}
