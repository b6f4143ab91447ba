//! Network availability edge detection
//!
//! Platforms report availability as a level; only a transition from a
//! known-offline state back to online triggers a pending-upload batch.

use crate::orchestrator::SyncOrchestrator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

pub struct ConnectivityMonitor {
    connected: AtomicBool,
    was_offline: AtomicBool,
}

impl ConnectivityMonitor {
    pub fn new(initially_connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(initially_connected),
            was_offline: AtomicBool::new(!initially_connected),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Record an availability report.
    ///
    /// Returns `true` exactly once per offline to online transition.
    /// Repeated "online" reports are no-ops.
    pub fn set_available(&self, available: bool) -> bool {
        let previous = self.connected.swap(available, Ordering::AcqRel);
        if !available {
            if previous {
                debug!("Connectivity lost");
            }
            self.was_offline.store(true, Ordering::Release);
            return false;
        }

        !previous && self.was_offline.swap(false, Ordering::AcqRel)
    }

    /// Follow `availability` until the sender is dropped, running the
    /// pending batch on every restore.
    pub async fn run(
        self: Arc<Self>,
        mut availability: watch::Receiver<bool>,
        orchestrator: Arc<SyncOrchestrator>,
    ) {
        loop {
            let available = *availability.borrow_and_update();
            if self.set_available(available) {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    let result = orchestrator.on_connectivity_restored().await;
                    debug!(?result, "Restore batch finished");
                });
            }

            if availability.changed().await.is_err() {
                info!("Connectivity source closed");
                break;
            }
        }
    }
}
