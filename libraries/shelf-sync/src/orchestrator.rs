//! Sync orchestration
//!
//! Every trigger (opening an item, pausing playback, connectivity coming
//! back, the periodic tick, a manual sync) ends up in the same per-item
//! routine: read local, fetch remote, reconcile, persist, upload if local
//! won. Only a confirmed upload clears the pending flag, so a failed or
//! cancelled attempt leaves the item queued for the next trigger.

use crate::error::{Result, SyncError};
use crate::reconciler::{reconcile_item, UploadRequest};
use crate::state::{resting_state, ReconcileGuard, SyncStates};
use crate::types::{
    BatchResult, OpenedItem, RemoteStatus, SyncConfig, SyncEvent, SyncOutcome, SyncState,
};
use shelf_core::types::AudiobookRecord;
use shelf_core::{ProgressGateway, ProgressStore, ShelfError, UpsertOutcome};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

/// Drives reconciliation between the local store and the server
pub struct SyncOrchestrator {
    store: Arc<dyn ProgressStore>,
    gateway: Arc<dyn ProgressGateway>,
    config: SyncConfig,
    states: SyncStates,
    batch: Mutex<()>,
}

/// Item after one resolution pass
struct Resolved {
    record: Option<AudiobookRecord>,
    outcome: SyncOutcome,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        gateway: Arc<dyn ProgressGateway>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
            states: SyncStates::new(),
            batch: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ProgressStore> {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.states.subscribe()
    }

    pub fn state(&self, item_id: &str) -> SyncState {
        self.states.get(item_id)
    }

    /// Load an item for playback.
    ///
    /// Returns the local copy with [`RemoteStatus::Unavailable`] when the
    /// server cannot be asked; fails only if the item is neither cached nor
    /// fetchable, or if the local store itself fails.
    pub async fn open_item(&self, item_id: &str) -> Result<OpenedItem> {
        let mut guard = self.states.begin(item_id);

        let local = self.load(item_id).await?;
        if let Some(local) = &local {
            guard.set_fallback(resting_state(local.progress.pending_upload));
        }

        let resolved = self.resolve(item_id, local, &mut guard).await?;
        let Some(record) = resolved.record else {
            let reason = match resolved.outcome {
                SyncOutcome::RemoteUnavailable(reason) => reason,
                other => format!("{:?}", other),
            };
            guard.finish(SyncState::Idle);
            return Err(SyncError::ItemUnavailable {
                item_id: item_id.to_string(),
                reason,
            });
        };

        guard.finish(resting_state(record.progress.pending_upload));
        let remote = match resolved.outcome {
            SyncOutcome::RemoteUnavailable(reason) => RemoteStatus::Unavailable(reason),
            _ => RemoteStatus::Reconciled,
        };

        Ok(OpenedItem { record, remote })
    }

    /// Re-evaluate one cached item against the server.
    pub async fn sync_item(&self, item_id: &str) -> Result<SyncOutcome> {
        let mut guard = self.states.begin(item_id);

        let local = self
            .load(item_id)
            .await?
            .ok_or_else(|| SyncError::NotCached(item_id.to_string()))?;
        guard.set_fallback(resting_state(local.progress.pending_upload));

        let resolved = self.resolve(item_id, Some(local), &mut guard).await?;
        let pending = resolved
            .record
            .as_ref()
            .is_some_and(|r| r.progress.pending_upload);
        guard.finish(resting_state(pending));

        Ok(resolved.outcome)
    }

    /// Manual sync: push the local position now, whatever the server has.
    pub async fn force_sync(&self, item_id: &str) -> Result<SyncOutcome> {
        let mut guard = self.states.begin(item_id);

        let local = self
            .load(item_id)
            .await?
            .ok_or_else(|| SyncError::NotCached(item_id.to_string()))?;

        let marked = local.with_progress(local.progress.with_pending(true));
        let record = match self.persist(&marked).await? {
            UpsertOutcome::Applied => marked,
            // A newer local write landed in between; push that one instead
            UpsertOutcome::Rejected => self
                .load(item_id)
                .await?
                .ok_or_else(|| SyncError::NotCached(item_id.to_string()))?,
        };
        guard.set_fallback(SyncState::UploadPending);

        info!(item_id = %item_id, last_update = record.progress.last_update, "Manual sync");

        let outcome = self.upload(&UploadRequest::from(&record.progress)).await?;
        guard.finish(if outcome == SyncOutcome::Uploaded {
            SyncState::Idle
        } else {
            SyncState::UploadPending
        });

        self.states.emit(SyncEvent::ItemSynced {
            item_id: item_id.to_string(),
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Retry every pending upload.
    ///
    /// Items are isolated: one failing item does not stop the others. If a
    /// batch is already running this returns `Retry` immediately.
    pub async fn retry_pending(&self) -> Result<BatchResult> {
        let Ok(_running) = self.batch.try_lock() else {
            debug!("Batch already running, skipping");
            return Ok(BatchResult::Retry);
        };

        let pending = self
            .store
            .list_pending_upload()
            .await
            .map_err(SyncError::Storage)?;
        let total = pending.len();
        if total > 0 {
            info!(count = total, "Retrying pending uploads");
        }

        let mut succeeded = 0;
        for record in pending {
            let item_id = record.id.clone();
            let mut guard = self.states.begin(&item_id);
            guard.set_fallback(SyncState::UploadPending);

            match self.resolve(&item_id, Some(record), &mut guard).await {
                Ok(resolved) => {
                    if resolved.outcome.is_success() {
                        succeeded += 1;
                    }
                    let pending = resolved
                        .record
                        .as_ref()
                        .is_some_and(|r| r.progress.pending_upload);
                    guard.finish(resting_state(pending));
                }
                Err(e) => {
                    error!(item_id = %item_id, error = %e, "Sync failed");
                    guard.finish(SyncState::UploadPending);
                }
            }
        }

        let result = if succeeded == total {
            BatchResult::Success
        } else {
            BatchResult::Retry
        };
        info!(succeeded, total, ?result, "Pending sync finished");
        self.states.emit(SyncEvent::BatchFinished {
            result,
            succeeded,
            total,
        });

        Ok(result)
    }

    /// Network came back after being lost.
    pub async fn on_connectivity_restored(&self) -> Result<BatchResult> {
        info!("Connectivity restored, syncing pending progress");
        self.retry_pending().await
    }

    /// Entry point for the background scheduler.
    pub async fn run_periodic_tick(&self) -> BatchResult {
        match self.retry_pending().await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Periodic sync failed");
                BatchResult::Retry
            }
        }
    }

    async fn load(&self, item_id: &str) -> Result<Option<AudiobookRecord>> {
        self.store
            .get_by_id(item_id)
            .await
            .map_err(SyncError::Storage)
    }

    async fn persist(&self, record: &AudiobookRecord) -> Result<UpsertOutcome> {
        self.store.upsert(record).await.map_err(SyncError::Storage)
    }

    async fn fetch_remote(&self, item_id: &str) -> shelf_core::Result<AudiobookRecord> {
        tokio::time::timeout(self.config.request_timeout, self.gateway.fetch_item(item_id))
            .await
            .unwrap_or(Err(ShelfError::Timeout))
    }

    /// Fetch, reconcile, persist and upload one item.
    async fn resolve(
        &self,
        item_id: &str,
        local: Option<AudiobookRecord>,
        guard: &mut ReconcileGuard<'_>,
    ) -> Result<Resolved> {
        let remote = match self.fetch_remote(item_id).await {
            Ok(remote) => remote,
            Err(e) => {
                if e.is_transient() {
                    info!(
                        item_id = %item_id,
                        error = %e,
                        "Server unreachable, keeping local progress"
                    );
                } else {
                    warn!(
                        item_id = %item_id,
                        error = %e,
                        "Server rejected fetch, keeping local progress"
                    );
                }
                return Ok(Resolved {
                    record: local,
                    outcome: SyncOutcome::RemoteUnavailable(e.to_string()),
                });
            }
        };

        let resolution = reconcile_item(local.as_ref(), remote);
        debug!(
            item_id = %item_id,
            local = ?local.as_ref().map(|l| l.progress.last_update),
            remote = resolution.record.progress.last_update,
            upload = resolution.upload.is_some(),
            "Reconciled"
        );

        if self.persist(&resolution.record).await? == UpsertOutcome::Rejected {
            debug!(item_id = %item_id, "Newer local progress written meanwhile");
            return Ok(Resolved {
                record: self.load(item_id).await?,
                outcome: SyncOutcome::Superseded,
            });
        }

        let Some(upload) = resolution.upload else {
            self.states.emit(SyncEvent::ItemSynced {
                item_id: item_id.to_string(),
                outcome: SyncOutcome::AdoptedRemote,
            });
            return Ok(Resolved {
                record: Some(resolution.record),
                outcome: SyncOutcome::AdoptedRemote,
            });
        };

        guard.set_fallback(SyncState::UploadPending);
        let outcome = self.upload(&upload).await?;
        let record = if outcome == SyncOutcome::Uploaded {
            resolution.record.with_progress(resolution.record.progress.synced())
        } else {
            resolution.record
        };

        self.states.emit(SyncEvent::ItemSynced {
            item_id: item_id.to_string(),
            outcome: outcome.clone(),
        });
        Ok(Resolved {
            record: Some(record),
            outcome,
        })
    }

    /// Push one position; clears the pending flag only on success and only
    /// if no newer local write landed meanwhile.
    async fn upload(&self, upload: &UploadRequest) -> Result<SyncOutcome> {
        let sent = tokio::time::timeout(
            self.config.request_timeout,
            self.gateway
                .patch_progress(&upload.item_id, upload.current_time, upload.last_update),
        )
        .await
        .unwrap_or(Err(ShelfError::Timeout));

        if let Err(e) = sent {
            if e.is_transient() {
                info!(
                    item_id = %upload.item_id,
                    error = %e,
                    "Server unreachable, upload stays pending"
                );
            } else {
                warn!(
                    item_id = %upload.item_id,
                    error = %e,
                    "Server rejected upload, keeping pending"
                );
            }
            return Ok(SyncOutcome::UploadFailed(e.to_string()));
        }

        let cleared = self
            .store
            .mark_synced_at(&upload.item_id, upload.last_update)
            .await
            .map_err(SyncError::Storage)?;

        if cleared {
            info!(
                item_id = %upload.item_id,
                current_time = upload.current_time,
                last_update = upload.last_update,
                "Progress uploaded"
            );
            Ok(SyncOutcome::Uploaded)
        } else {
            debug!(item_id = %upload.item_id, "Uploaded, but a newer position is pending");
            Ok(SyncOutcome::Superseded)
        }
    }
}
