//! Last-write-wins progress reconciliation
//!
//! Pure functions: the outcome depends only on the two records passed in.
//! `last_update` is the sole ordering key; on a tie the server copy wins and
//! nothing is uploaded.

use serde::{Deserialize, Serialize};
use shelf_core::types::{AudiobookRecord, ProgressRecord};

/// Progress to push to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub item_id: String,
    pub current_time: f64,
    pub last_update: i64,
}

impl From<&ProgressRecord> for UploadRequest {
    fn from(progress: &ProgressRecord) -> Self {
        Self {
            item_id: progress.item_id.clone(),
            current_time: progress.current_time,
            last_update: progress.last_update,
        }
    }
}

/// Decision for one progress record
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Store the server copy as confirmed
    AdoptRemote(ProgressRecord),
    /// Local copy is newer: keep it pending and upload it
    KeepLocal {
        record: ProgressRecord,
        upload: UploadRequest,
    },
}

impl ReconcileOutcome {
    pub fn record(&self) -> &ProgressRecord {
        match self {
            Self::AdoptRemote(record) | Self::KeepLocal { record, .. } => record,
        }
    }

    pub fn upload(&self) -> Option<&UploadRequest> {
        match self {
            Self::AdoptRemote(_) => None,
            Self::KeepLocal { upload, .. } => Some(upload),
        }
    }
}

pub fn reconcile(local: Option<&ProgressRecord>, remote: &ProgressRecord) -> ReconcileOutcome {
    match local {
        Some(local) if local.is_newer_than(remote) => {
            let record = local.with_pending(true);
            let upload = UploadRequest::from(&record);
            ReconcileOutcome::KeepLocal { record, upload }
        }
        _ => ReconcileOutcome::AdoptRemote(remote.synced()),
    }
}

/// Merged item: fresh server metadata with the winning progress
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResolution {
    pub record: AudiobookRecord,
    pub upload: Option<UploadRequest>,
}

/// Reconcile a whole item. Metadata always comes from `remote`.
pub fn reconcile_item(local: Option<&AudiobookRecord>, remote: AudiobookRecord) -> ItemResolution {
    match reconcile(local.map(|l| &l.progress), &remote.progress) {
        ReconcileOutcome::AdoptRemote(progress) => ItemResolution {
            record: remote.with_progress(progress),
            upload: None,
        },
        ReconcileOutcome::KeepLocal { record, upload } => ItemResolution {
            record: remote.with_progress(record),
            upload: Some(upload),
        },
    }
}
