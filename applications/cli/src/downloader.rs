//! HTTP download engine writing tracks into a local directory
//!
//! Every transfer runs as its own task and reports through the shared
//! [`DownloadProgressTracker`], the same way a platform download manager
//! would call back into it.

use futures_util::StreamExt;
use reqwest::Client;
use shelf_core::DownloadEngine;
use shelf_downloads::{DownloadEvent, DownloadProgressTracker, RawDownloadState};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type ActiveDownloads = Arc<Mutex<HashMap<String, JoinHandle<()>>>>;

pub struct HttpDownloadEngine {
    http: Client,
    root: PathBuf,
    tracker: Arc<DownloadProgressTracker>,
    active: ActiveDownloads,
}

fn lock(active: &ActiveDownloads) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HttpDownloadEngine {
    pub fn new(
        http: Client,
        root: impl Into<PathBuf>,
        tracker: Arc<DownloadProgressTracker>,
    ) -> Self {
        Self {
            http,
            root: root.into(),
            tracker,
            active: Arc::default(),
        }
    }

    /// Where a finished track lives on disk
    pub fn path_for(&self, track_id: &str) -> PathBuf {
        self.root
            .join(track_id.trim_start_matches('/').replace(['/', '\\'], "_"))
    }

    fn partial_path(&self, track_id: &str) -> PathBuf {
        let mut path = self.path_for(track_id).into_os_string();
        path.push(".part");
        PathBuf::from(path)
    }

    /// Transfers still running
    pub fn active_count(&self) -> usize {
        lock(&self.active).len()
    }
}

impl DownloadEngine for HttpDownloadEngine {
    fn is_downloaded(&self, track_id: &str) -> bool {
        self.path_for(track_id).is_file()
    }

    fn is_downloading(&self, track_id: &str) -> bool {
        lock(&self.active).contains_key(track_id)
    }

    fn request_add(&self, track_id: &str, url: &str) {
        let mut active = lock(&self.active);
        if active.contains_key(track_id) || self.is_downloaded(track_id) {
            debug!(track_id = %track_id, "Download already known");
            return;
        }

        self.tracker
            .on_download_changed(DownloadEvent::new(track_id, 0, RawDownloadState::Queued));

        let transfer = Transfer {
            http: self.http.clone(),
            url: url.to_string(),
            track_id: track_id.to_string(),
            partial: self.partial_path(track_id),
            destination: self.path_for(track_id),
            tracker: Arc::clone(&self.tracker),
        };
        let registry = Arc::clone(&self.active);
        let id = track_id.to_string();

        let handle = tokio::spawn(async move {
            transfer.run().await;
            lock(&registry).remove(&id);
        });
        active.insert(track_id.to_string(), handle);
    }

    fn request_remove(&self, track_id: &str) {
        if let Some(handle) = lock(&self.active).remove(track_id) {
            handle.abort();
        }

        for path in [self.partial_path(track_id), self.path_for(track_id)] {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed download file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove download file");
                }
            }
        }

        self.tracker.on_download_removed(track_id);
    }
}

/// One track transfer
struct Transfer {
    http: Client,
    url: String,
    track_id: String,
    partial: PathBuf,
    destination: PathBuf,
    tracker: Arc<DownloadProgressTracker>,
}

impl Transfer {
    async fn run(self) {
        match self.fetch().await {
            Ok(bytes) => {
                self.tracker.on_download_changed(
                    DownloadEvent::new(&self.track_id, bytes, RawDownloadState::Completed)
                        .with_total(bytes),
                );
                info!(track_id = %self.track_id, size = bytes, "Track downloaded");
            }
            Err(e) => {
                warn!(track_id = %self.track_id, error = %e, "Track download failed");
                let _ = tokio::fs::remove_file(&self.partial).await;
                self.tracker.on_download_changed(DownloadEvent::new(
                    &self.track_id,
                    0,
                    RawDownloadState::Failed,
                ));
            }
        }
    }

    async fn fetch(&self) -> anyhow::Result<u64> {
        let response = self.http.get(&self.url).send().await?.error_for_status()?;
        let total = response.content_length();

        if let Some(parent) = self.partial.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(&self.partial).await?;
        let mut downloaded: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            let event =
                DownloadEvent::new(&self.track_id, downloaded, RawDownloadState::Downloading);
            self.tracker.on_download_changed(match total {
                Some(total) => event.with_total(total),
                None => event,
            });
        }

        file.flush().await?;
        tokio::fs::rename(&self.partial, &self.destination).await?;
        Ok(downloaded)
    }
}

