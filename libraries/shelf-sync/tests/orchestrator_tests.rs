//! Sync orchestrator integration tests
//!
//! Real `SQLite` store, fake server.

mod test_helpers;

use shelf_core::ProgressStore;
use shelf_sync::{
    BatchResult, ConnectivityMonitor, PeriodicSync, RemoteStatus, SyncConfig, SyncError,
    SyncEvent, SyncOutcome, SyncState,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::*;

// ============================================================================
// Reconciliation
// ============================================================================

mod reconciliation {
    use super::*;

    #[tokio::test]
    async fn test_newer_local_is_uploaded_and_cleared() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let book = test_book("li_1");
        db.store.upsert(&at_position(&book, 50.0, 100, true)).await.unwrap();
        gateway.put(&at_position(&book, 40.0, 80, false));

        let sync = orchestrator(&db, &gateway);
        let outcome = sync.sync_item("li_1").await.unwrap();

        assert_eq!(outcome, SyncOutcome::Uploaded);
        assert_eq!(gateway.patches(), vec![("li_1".to_string(), 50.0, 100)]);

        let stored = db.store.get_by_id("li_1").await.unwrap().unwrap();
        assert_eq!(stored.progress.current_time, 50.0);
        assert_eq!(stored.progress.last_update, 100);
        assert!(!stored.progress.pending_upload);
        assert_eq!(sync.state("li_1"), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_open_unknown_item_adopts_remote_verbatim() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let remote = at_position(&test_book("li_2"), 120.0, 200, false);
        gateway.put(&remote);

        let sync = orchestrator(&db, &gateway);
        let opened = sync.open_item("li_2").await.unwrap();

        assert_eq!(opened.remote, RemoteStatus::Reconciled);
        assert_eq!(opened.record, remote);
        assert_eq!(db.store.get_by_id("li_2").await.unwrap(), Some(remote));
        assert!(gateway.patches().is_empty());
    }

    #[tokio::test]
    async fn test_tie_adopts_remote_without_upload() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let book = test_book("li_1");
        db.store.upsert(&at_position(&book, 50.0, 100, true)).await.unwrap();
        gateway.put(&at_position(&book, 50.0, 100, false));

        let sync = orchestrator(&db, &gateway);
        let outcome = sync.sync_item("li_1").await.unwrap();

        assert_eq!(outcome, SyncOutcome::AdoptedRemote);
        assert!(gateway.patches().is_empty());
        let stored = db.store.get_by_id("li_1").await.unwrap().unwrap();
        assert!(!stored.progress.pending_upload);
    }

    #[tokio::test]
    async fn test_newer_remote_replaces_pending_local() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let book = test_book("li_1");
        db.store.upsert(&at_position(&book, 50.0, 100, true)).await.unwrap();
        gateway.put(&at_position(&book, 900.0, 5_000, false));

        let sync = orchestrator(&db, &gateway);
        let opened = sync.open_item("li_1").await.unwrap();

        assert_eq!(opened.record.progress.current_time, 900.0);
        assert!(!opened.record.progress.pending_upload);
        assert!(gateway.patches().is_empty());
    }

    #[tokio::test]
    async fn test_remote_metadata_refreshes_local_copy() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let book = test_book("li_1");
        db.store.upsert(&at_position(&book, 50.0, 100, true)).await.unwrap();

        let mut renamed = at_position(&book, 40.0, 80, false);
        renamed.media.metadata.title = "Renamed".to_string();
        gateway.put(&renamed);

        let sync = orchestrator(&db, &gateway);
        let opened = sync.open_item("li_1").await.unwrap();

        assert_eq!(opened.record.title(), "Renamed");
        assert_eq!(opened.record.progress.current_time, 50.0);
    }
}

// ============================================================================
// Server unavailable
// ============================================================================

mod unavailable {
    use super::*;

    #[tokio::test]
    async fn test_open_offline_shows_local() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let local = at_position(&test_book("li_1"), 50.0, 100, true);
        db.store.upsert(&local).await.unwrap();
        gateway.set_offline(true);

        let sync = orchestrator(&db, &gateway);
        let opened = sync.open_item("li_1").await.unwrap();

        assert!(matches!(opened.remote, RemoteStatus::Unavailable(_)));
        assert_eq!(opened.record, local);
        assert_eq!(db.store.get_by_id("li_1").await.unwrap(), Some(local));
        assert_eq!(sync.state("li_1"), SyncState::UploadPending);
    }

    #[tokio::test]
    async fn test_open_unknown_item_offline_fails() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        gateway.set_offline(true);

        let sync = orchestrator(&db, &gateway);
        let result = sync.open_item("li_missing").await;

        assert!(matches!(result, Err(SyncError::ItemUnavailable { .. })));
        assert_eq!(sync.state("li_missing"), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_sync_uncached_item_fails() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();

        let sync = orchestrator(&db, &gateway);
        let result = sync.sync_item("li_missing").await;

        assert!(matches!(result, Err(SyncError::NotCached(_))));
        assert_eq!(gateway.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_timeout_keeps_pending_until_next_tick() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let book = test_book("li_1");
        db.store.upsert(&at_position(&book, 50.0, 100, true)).await.unwrap();
        gateway.put(&at_position(&book, 40.0, 80, false));
        gateway.delay_patches(Duration::from_secs(2));

        let sync = orchestrator(&db, &gateway);
        let outcome = sync.sync_item("li_1").await.unwrap();

        assert!(matches!(outcome, SyncOutcome::UploadFailed(_)));
        let stored = db.store.get_by_id("li_1").await.unwrap().unwrap();
        assert!(stored.progress.pending_upload);
        assert_eq!(sync.state("li_1"), SyncState::UploadPending);

        gateway.heal();
        assert_eq!(sync.run_periodic_tick().await, BatchResult::Success);
        let stored = db.store.get_by_id("li_1").await.unwrap().unwrap();
        assert!(!stored.progress.pending_upload);
        assert_eq!(gateway.patches(), vec![("li_1".to_string(), 50.0, 100)]);
    }

    #[tokio::test]
    async fn test_cancelled_sync_leaves_pending() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let book = test_book("li_1");
        db.store.upsert(&at_position(&book, 50.0, 100, true)).await.unwrap();
        gateway.put(&at_position(&book, 40.0, 80, false));
        gateway.delay_patches(Duration::from_secs(5));

        let sync = orchestrator(&db, &gateway);
        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), sync.sync_item("li_1")).await;

        assert!(cancelled.is_err());
        let stored = db.store.get_by_id("li_1").await.unwrap().unwrap();
        assert!(stored.progress.pending_upload);
        assert_eq!(sync.state("li_1"), SyncState::UploadPending);
    }
}

// ============================================================================
// Manual sync
// ============================================================================

mod manual {
    use super::*;

    #[tokio::test]
    async fn test_force_sync_uploads_regardless_of_remote() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let book = test_book("li_1");
        db.store.upsert(&at_position(&book, 50.0, 100, false)).await.unwrap();
        gateway.put(&at_position(&book, 900.0, 5_000, false));

        let sync = orchestrator(&db, &gateway);
        let outcome = sync.force_sync("li_1").await.unwrap();

        assert_eq!(outcome, SyncOutcome::Uploaded);
        assert_eq!(gateway.patches(), vec![("li_1".to_string(), 50.0, 100)]);
        assert_eq!(gateway.fetches.load(Ordering::SeqCst), 0);
        let stored = db.store.get_by_id("li_1").await.unwrap().unwrap();
        assert!(!stored.progress.pending_upload);
    }

    #[tokio::test]
    async fn test_failed_force_sync_sets_pending() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let book = test_book("li_1");
        db.store.upsert(&at_position(&book, 50.0, 100, false)).await.unwrap();
        gateway.set_offline(true);

        let sync = orchestrator(&db, &gateway);
        let outcome = sync.force_sync("li_1").await.unwrap();

        assert!(matches!(outcome, SyncOutcome::UploadFailed(_)));
        let stored = db.store.get_by_id("li_1").await.unwrap().unwrap();
        assert!(stored.progress.pending_upload);
        assert_eq!(sync.state("li_1"), SyncState::UploadPending);

        // Forcing again never toggles the flag off
        let _ = sync.force_sync("li_1").await.unwrap();
        let stored = db.store.get_by_id("li_1").await.unwrap().unwrap();
        assert!(stored.progress.pending_upload);
    }
}

// ============================================================================
// Batch retry
// ============================================================================

mod batch {
    use super::*;

    async fn seed_pending(db: &TestDb, gateway: &FakeGateway, ids: &[&str]) {
        for (i, id) in ids.iter().enumerate() {
            let book = test_book(id);
            let stamp = 1_000 + i as i64;
            db.store
                .upsert(&at_position(&book, 60.0, stamp, true))
                .await
                .unwrap();
            gateway.put(&at_position(&book, 10.0, 500, false));
        }
    }

    #[tokio::test]
    async fn test_item_failures_are_isolated() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        seed_pending(&db, &gateway, &["li_a", "li_b", "li_c"]).await;
        gateway.fail_patch_for("li_b");

        let sync = orchestrator(&db, &gateway);
        let mut events = sync.subscribe();
        assert_eq!(sync.retry_pending().await.unwrap(), BatchResult::Retry);

        let pending: Vec<String> = db
            .store
            .list_pending_upload()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(pending, vec!["li_b".to_string()]);

        let mut finished = None;
        while let Ok(event) = events.try_recv() {
            if let SyncEvent::BatchFinished { succeeded, total, .. } = event {
                finished = Some((succeeded, total));
            }
        }
        assert_eq!(finished, Some((2, 3)));

        gateway.heal();
        assert_eq!(sync.retry_pending().await.unwrap(), BatchResult::Success);
        assert!(db.store.list_pending_upload().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_succeeds() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();

        let sync = orchestrator(&db, &gateway);
        assert_eq!(sync.retry_pending().await.unwrap(), BatchResult::Success);
        assert_eq!(gateway.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_batches_coalesce() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        seed_pending(&db, &gateway, &["li_a"]).await;
        gateway.delay_patches(Duration::from_millis(50));

        let sync = orchestrator(&db, &gateway);
        let (first, second) = tokio::join!(
            sync.on_connectivity_restored(),
            sync.on_connectivity_restored()
        );

        assert_eq!(first.unwrap(), BatchResult::Success);
        assert_eq!(second.unwrap(), BatchResult::Retry);
        assert_eq!(gateway.patches().len(), 1);
    }

    #[tokio::test]
    async fn test_connectivity_monitor_runs_batch_on_restore() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        seed_pending(&db, &gateway, &["li_a"]).await;

        let sync = orchestrator(&db, &gateway);
        let (tx, rx) = tokio::sync::watch::channel(false);
        let monitor = Arc::new(ConnectivityMonitor::new(false));
        let task = tokio::spawn(Arc::clone(&monitor).run(rx, Arc::clone(&sync)));

        tx.send(true).unwrap();
        for _ in 0..100 {
            if db.store.list_pending_upload().await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(db.store.list_pending_upload().await.unwrap().is_empty());
        assert!(monitor.is_connected());

        drop(tx);
        task.await.unwrap();
    }
}

// ============================================================================
// Events
// ============================================================================

mod events {
    use super::*;

    #[tokio::test]
    async fn test_upload_emits_state_transitions() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        let book = test_book("li_1");
        db.store.upsert(&at_position(&book, 50.0, 100, true)).await.unwrap();
        gateway.put(&at_position(&book, 40.0, 80, false));

        let sync = orchestrator(&db, &gateway);
        let mut events = sync.subscribe();
        sync.sync_item("li_1").await.unwrap();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }

        assert_eq!(
            received,
            vec![
                SyncEvent::StateChanged {
                    item_id: "li_1".into(),
                    state: SyncState::Reconciling,
                },
                SyncEvent::ItemSynced {
                    item_id: "li_1".into(),
                    outcome: SyncOutcome::Uploaded,
                },
                SyncEvent::StateChanged {
                    item_id: "li_1".into(),
                    state: SyncState::Idle,
                },
            ]
        );
    }
}

// ============================================================================
// Periodic sync
// ============================================================================

mod periodic {
    use super::*;
    use tokio::sync::watch;

    async fn seed_pending(db: &TestDb, gateway: &FakeGateway, id: &str) {
        let book = test_book(id);
        db.store
            .upsert(&at_position(&book, 60.0, 1_000, true))
            .await
            .unwrap();
        gateway.put(&at_position(&book, 10.0, 500, false));
    }

    #[tokio::test]
    async fn test_offline_tick_is_skipped() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        seed_pending(&db, &gateway, "li_1").await;

        let (_tx, rx) = watch::channel(false);
        let periodic = PeriodicSync::new(orchestrator(&db, &gateway)).with_network(rx);

        assert_eq!(periodic.run_once().await, BatchResult::Retry);
        assert_eq!(gateway.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(db.store.list_pending_upload().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_online_tick_uploads_pending() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        seed_pending(&db, &gateway, "li_1").await;

        let (_tx, rx) = watch::channel(true);
        let periodic = PeriodicSync::new(orchestrator(&db, &gateway)).with_network(rx);

        assert_eq!(periodic.run_once().await, BatchResult::Success);
        assert_eq!(gateway.patches().len(), 1);
        assert!(db.store.list_pending_upload().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_batch_is_retried_then_gives_up() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        seed_pending(&db, &gateway, "li_1").await;
        gateway.fail_patch_for("li_1");

        let periodic = PeriodicSync::new(orchestrator(&db, &gateway));

        assert_eq!(periodic.run_once().await, BatchResult::Retry);
        // First run plus backoff_retries (2)
        assert_eq!(gateway.fetches.load(Ordering::SeqCst), 3);
        assert_eq!(db.store.list_pending_upload().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_still_runs_once() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        seed_pending(&db, &gateway, "li_1").await;
        gateway.fail_patch_for("li_1");

        let config = SyncConfig {
            backoff_retries: 0,
            ..test_config()
        };
        let periodic = PeriodicSync::new(orchestrator_with(&db, &gateway, config));

        assert_eq!(periodic.run_once().await, BatchResult::Retry);
        assert_eq!(gateway.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_recovering_during_backoff() {
        let db = TestDb::new().await;
        let gateway = FakeGateway::new();
        seed_pending(&db, &gateway, "li_1").await;
        gateway.fail_patch_for("li_1");

        let healer = gateway.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            healer.heal();
        });

        let periodic = PeriodicSync::new(orchestrator(&db, &gateway));

        assert_eq!(periodic.run_once().await, BatchResult::Success);
        assert_eq!(gateway.patches(), vec![("li_1".to_string(), 60.0, 1_000)]);
        assert!(db.store.list_pending_upload().await.unwrap().is_empty());
    }
}
