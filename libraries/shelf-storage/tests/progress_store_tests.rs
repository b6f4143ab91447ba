//! Local progress store tests


use proptest::prelude::*;
use shelf_core::{ProgressStore, UpsertOutcome};
use shelf_storage::audiobooks;
use test_helpers::*;

// ============================================================================
// Insert / read
// ============================================================================

#[tokio::test]
async fn test_get_unknown_item_returns_none() {
    let db = TestDb::new().await;
    let store = db.store();

    let found = store.get_by_id("li_missing").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_upsert_inserts_new_item() {
    let db = TestDb::new().await;
    let store = db.store();
    let book = at_position(&test_book("li_1", "Dune"), 120.0, 1_000, true);

    let outcome = store.upsert(&book).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Applied);

    let stored = store.get_by_id("li_1").await.unwrap().unwrap();
    assert_eq!(stored, book);
    assert_eq!(stored.media.tracks.len(), 2);
    assert_eq!(stored.progress.current_time, 120.0);
    assert!(stored.progress.pending_upload);
}

#[tokio::test]
async fn test_finished_at_round_trips_null_and_value() {
    let db = TestDb::new().await;
    let store = db.store();

    let mut book = test_book("li_1", "Dune");
    book.progress.is_finished = true;
    book.progress.finished_at = Some(9_000);
    book.progress.last_update = 9_000;
    store.upsert(&book).await.unwrap();

    let stored = store.get_by_id("li_1").await.unwrap().unwrap();
    assert!(stored.progress.is_finished);
    assert_eq!(stored.progress.finished_at, Some(9_000));

    let unfinished = test_book("li_2", "Emma");
    store.upsert(&unfinished).await.unwrap();
    let stored = store.get_by_id("li_2").await.unwrap().unwrap();
    assert_eq!(stored.progress.finished_at, None);
}

// ============================================================================
// Merge-aware upsert
// ============================================================================

#[tokio::test]
async fn test_older_write_is_rejected() {
    let db = TestDb::new().await;
    let store = db.store();
    let book = test_book("li_1", "Dune");

    store
        .upsert(&at_position(&book, 500.0, 2_000, true))
        .await
        .unwrap();

    let outcome = store
        .upsert(&at_position(&book, 100.0, 1_000, false))
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Rejected);

    let stored = store.get_by_id("li_1").await.unwrap().unwrap();
    assert_eq!(stored.progress.current_time, 500.0);
    assert_eq!(stored.progress.last_update, 2_000);
    assert!(stored.progress.pending_upload);
}

#[tokio::test]
async fn test_equal_timestamp_is_accepted() {
    let db = TestDb::new().await;
    let store = db.store();
    let book = test_book("li_1", "Dune");

    store
        .upsert(&at_position(&book, 500.0, 2_000, true))
        .await
        .unwrap();

    let outcome = store
        .upsert(&at_position(&book, 500.0, 2_000, false))
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Applied);

    let stored = store.get_by_id("li_1").await.unwrap().unwrap();
    assert!(!stored.progress.pending_upload);
}

#[tokio::test]
async fn test_newer_write_replaces_metadata_too() {
    let db = TestDb::new().await;
    let store = db.store();

    store
        .upsert(&at_position(&test_book("li_1", "Dune"), 10.0, 1_000, false))
        .await
        .unwrap();
    store
        .upsert(&at_position(
            &test_book("li_1", "Dune Messiah"),
            20.0,
            2_000,
            false,
        ))
        .await
        .unwrap();

    let stored = store.get_by_id("li_1").await.unwrap().unwrap();
    assert_eq!(stored.title(), "Dune Messiah");
    assert_eq!(stored.progress.current_time, 20.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_never_regress() {
    let db = TestDb::new().await;
    let store = db.store();
    let book = test_book("li_1", "Dune");

    let mut handles = Vec::new();
    for ts in (1..=40_i64).rev() {
        let store = store.clone();
        let record = at_position(&book, ts as f64 * 10.0, ts, true);
        handles.push(tokio::spawn(async move { store.upsert(&record).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.get_by_id("li_1").await.unwrap().unwrap();
    assert_eq!(stored.progress.last_update, 40);
    assert_eq!(stored.progress.current_time, 400.0);
}

// ============================================================================
// Pending upload bookkeeping
// ============================================================================

#[tokio::test]
async fn test_list_pending_upload_most_recent_first() {
    let db = TestDb::new().await;
    let store = db.store();

    store
        .upsert(&at_position(&test_book("li_a", "A"), 1.0, 1_000, true))
        .await
        .unwrap();
    store
        .upsert(&at_position(&test_book("li_b", "B"), 1.0, 3_000, true))
        .await
        .unwrap();
    store
        .upsert(&at_position(&test_book("li_c", "C"), 1.0, 2_000, false))
        .await
        .unwrap();
    store
        .upsert(&at_position(&test_book("li_d", "D"), 1.0, 2_500, true))
        .await
        .unwrap();

    let pending = store.list_pending_upload().await.unwrap();
    let ids: Vec<&str> = pending.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["li_b", "li_d", "li_a"]);
}

#[tokio::test]
async fn test_mark_synced_only_clears_flag() {
    let db = TestDb::new().await;
    let store = db.store();
    let book = at_position(&test_book("li_1", "Dune"), 321.5, 7_000, true);
    store.upsert(&book).await.unwrap();

    store.mark_synced("li_1").await.unwrap();

    let stored = store.get_by_id("li_1").await.unwrap().unwrap();
    assert!(!stored.progress.pending_upload);
    assert_eq!(stored.progress.current_time, 321.5);
    assert_eq!(stored.progress.last_update, 7_000);
    assert_eq!(stored.media, book.media);
    assert!(store.list_pending_upload().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mark_synced_unknown_item_is_noop() {
    let db = TestDb::new().await;
    let store = db.store();

    store.mark_synced("li_missing").await.unwrap();
    assert!(!store.mark_synced_at("li_missing", 1).await.unwrap());
}

#[tokio::test]
async fn test_mark_synced_at_keeps_newer_pending_write() {
    let db = TestDb::new().await;
    let store = db.store();
    let book = test_book("li_1", "Dune");

    store
        .upsert(&at_position(&book, 100.0, 1_000, true))
        .await
        .unwrap();
    // Playback moves on while the upload of 1_000 is in flight
    store
        .upsert(&at_position(&book, 130.0, 1_500, true))
        .await
        .unwrap();

    let cleared = store.mark_synced_at("li_1", 1_000).await.unwrap();
    assert!(!cleared);

    let stored = store.get_by_id("li_1").await.unwrap().unwrap();
    assert!(stored.progress.pending_upload);
    assert_eq!(stored.progress.last_update, 1_500);

    assert!(store.mark_synced_at("li_1", 1_500).await.unwrap());
    let stored = store.get_by_id("li_1").await.unwrap().unwrap();
    assert!(!stored.progress.pending_upload);
}

// ============================================================================
// Cache listing
// ============================================================================

#[tokio::test]
async fn test_list_all_orders_by_title() {
    let db = TestDb::new().await;

    audiobooks::upsert(db.pool(), &test_book("li_1", "zen"))
        .await
        .unwrap();
    audiobooks::upsert(db.pool(), &test_book("li_2", "Alpha"))
        .await
        .unwrap();
    audiobooks::upsert(db.pool(), &test_book("li_3", "beta"))
        .await
        .unwrap();

    let all = db.store().list_all().await.unwrap();
    let titles: Vec<&str> = all.iter().map(|b| b.title()).collect();
    assert_eq!(titles, vec!["Alpha", "beta", "zen"]);
}

#[tokio::test]
async fn test_delete() {
    let db = TestDb::new().await;
    let store = db.store();
    store.upsert(&test_book("li_1", "Dune")).await.unwrap();

    assert!(store.delete("li_1").await.unwrap());
    assert!(!store.delete("li_1").await.unwrap());
    assert!(store.get_by_id("li_1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_open_creates_and_migrates() {
    let temp_dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", temp_dir.path().join("fresh.db").display());

    let store = shelf_storage::LocalProgressStore::open(&url).await.unwrap();
    store.upsert(&test_book("li_1", "Dune")).await.unwrap();

    // Reopening runs migrations again without error
    let reopened = shelf_storage::LocalProgressStore::open(&url).await.unwrap();
    assert!(reopened.get_by_id("li_1").await.unwrap().is_some());
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Whatever order writes arrive in, the stored record is the newest one
    #[test]
    fn prop_store_keeps_newest(stamps in prop::collection::vec(0_i64..10_000, 1..12)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let db = TestDb::new().await;
            let store = db.store();
            let book = test_book("li_1", "Dune");

            for ts in &stamps {
                store.upsert(&at_position(&book, *ts as f64, *ts, true)).await.unwrap();
            }

            let max = *stamps.iter().max().unwrap();
            let stored = store.get_by_id("li_1").await.unwrap().unwrap();
            prop_assert_eq!(stored.progress.last_update, max);
            prop_assert_eq!(stored.progress.current_time, max as f64);

            // Re-applying the stored record is idempotent
            let again = store.upsert(&stored).await.unwrap();
            prop_assert_eq!(again, UpsertOutcome::Applied);
            prop_assert_eq!(store.get_by_id("li_1").await.unwrap().unwrap(), stored);
            Ok(())
        })?;
    }
}
