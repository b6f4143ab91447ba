//! Fakes and fixtures for orchestrator integration tests
//!
//! The store is a real `SQLite` file; only the server and the player are
//! faked.

#![allow(dead_code)]

use async_trait::async_trait;
use shelf_core::types::*;
use shelf_core::{Player, ProgressGateway, ShelfError};
use shelf_storage::LocalProgressStore;
use shelf_sync::{SyncConfig, SyncOrchestrator};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub struct TestDb {
    pub store: LocalProgressStore,
    _temp_dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}", temp_dir.path().join("test.db").display());
        let store = LocalProgressStore::open(&db_url)
            .await
            .expect("Failed to open store");

        Self {
            store,
            _temp_dir: temp_dir,
        }
    }
}

/// In-memory audiobook server
#[derive(Default)]
pub struct FakeGateway {
    items: Mutex<HashMap<String, AudiobookRecord>>,
    pub offline: AtomicBool,
    failing_patches: Mutex<HashSet<String>>,
    patch_delay: Mutex<Option<Duration>>,
    pub fetches: AtomicUsize,
    patches: Mutex<Vec<(String, f64, i64)>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Server-side copy; always confirmed
    pub fn put(&self, record: &AudiobookRecord) {
        let record = record.with_progress(record.progress.synced());
        self.items
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn remote(&self, item_id: &str) -> Option<AudiobookRecord> {
        self.items.lock().unwrap().get(item_id).cloned()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fail_patch_for(&self, item_id: &str) {
        self.failing_patches
            .lock()
            .unwrap()
            .insert(item_id.to_string());
    }

    pub fn heal(&self) {
        self.failing_patches.lock().unwrap().clear();
        *self.patch_delay.lock().unwrap() = None;
        self.set_offline(false);
    }

    pub fn delay_patches(&self, delay: Duration) {
        *self.patch_delay.lock().unwrap() = Some(delay);
    }

    pub fn patches(&self) -> Vec<(String, f64, i64)> {
        self.patches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressGateway for FakeGateway {
    async fn fetch_item(&self, item_id: &str) -> shelf_core::Result<AudiobookRecord> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(ShelfError::Unreachable("connection refused".into()));
        }
        self.remote(item_id).ok_or_else(|| ShelfError::Http {
            status: 404,
            message: "Not Found".into(),
        })
    }

    async fn patch_progress(
        &self,
        item_id: &str,
        current_time: f64,
        last_update: i64,
    ) -> shelf_core::Result<()> {
        let delay = *self.patch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(ShelfError::Unreachable("connection refused".into()));
        }
        if self.failing_patches.lock().unwrap().contains(item_id) {
            return Err(ShelfError::Http {
                status: 500,
                message: "Internal Server Error".into(),
            });
        }

        self.patches
            .lock()
            .unwrap()
            .push((item_id.to_string(), current_time, last_update));
        if let Some(item) = self.items.lock().unwrap().get_mut(item_id) {
            item.progress.current_time = current_time;
            item.progress.last_update = last_update;
        }
        Ok(())
    }
}

/// Player whose position the test moves by hand
#[derive(Clone, Default)]
pub struct FakePlayer {
    pub position: Arc<Mutex<(usize, f64)>>,
    pub playing: Arc<AtomicBool>,
}

impl FakePlayer {
    pub fn advance_to(&self, track_index: usize, offset: f64) {
        *self.position.lock().unwrap() = (track_index, offset);
    }
}

impl Player for FakePlayer {
    fn play(&mut self) {
        self.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn seek(&mut self, track_index: usize, offset: f64) {
        *self.position.lock().unwrap() = (track_index, offset);
    }

    fn position(&self) -> (usize, f64) {
        *self.position.lock().unwrap()
    }

    fn duration(&self) -> Option<f64> {
        Some(1800.0)
    }
}

pub fn test_config() -> SyncConfig {
    SyncConfig {
        request_timeout: Duration::from_millis(200),
        backoff_retries: 2,
        backoff_min: Duration::from_millis(10),
        backoff_max: Duration::from_millis(20),
        ..SyncConfig::default()
    }
}

pub fn orchestrator(db: &TestDb, gateway: &Arc<FakeGateway>) -> Arc<SyncOrchestrator> {
    orchestrator_with(db, gateway, test_config())
}

pub fn orchestrator_with(
    db: &TestDb,
    gateway: &Arc<FakeGateway>,
    config: SyncConfig,
) -> Arc<SyncOrchestrator> {
    Arc::new(SyncOrchestrator::new(
        Arc::new(db.store.clone()),
        gateway.clone(),
        config,
    ))
}

/// Two tracks of 30 minutes
pub fn test_book(id: &str) -> AudiobookRecord {
    test_book_numbered_from(id, 0)
}

/// Two 30 minute tracks whose server `index` starts at `first`
pub fn test_book_numbered_from(id: &str, first: u32) -> AudiobookRecord {
    let track = |slot: u32| AudioTrack {
        index: first + slot,
        start_offset: f64::from(slot) * 1800.0,
        duration: 1800.0,
        title: format!("Part {}", slot + 1),
        content_url: format!("/s/item/{id}/part{}.mp3", slot + 1),
        mime_type: "audio/mpeg".to_string(),
    };

    AudiobookRecord::new(
        id,
        "lib_1",
        Media {
            metadata: BookMetadata {
                title: format!("Book {id}"),
                author_name: "Test Author".to_string(),
                ..Default::default()
            },
            tracks: vec![track(0), track(1)],
            chapters: vec![
                Chapter {
                    id: 0,
                    start: 0.0,
                    end: 1800.0,
                    title: "Chapter 1".to_string(),
                },
                Chapter {
                    id: 1,
                    start: 1800.0,
                    end: 3600.0,
                    title: "Chapter 2".to_string(),
                },
            ],
            duration: 3600.0,
            size: 50_000_000,
        },
    )
}

pub fn at_position(
    book: &AudiobookRecord,
    current_time: f64,
    last_update: i64,
    pending: bool,
) -> AudiobookRecord {
    book.with_progress(ProgressRecord {
        current_time,
        last_update,
        pending_upload: pending,
        ..book.progress.clone()
    })
}
