//! Periodic background sync with exponential backoff on failed batches

use crate::orchestrator::SyncOrchestrator;
use crate::types::BatchResult;
use exponential_backoff::Backoff;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Runs the pending batch on a fixed interval
pub struct PeriodicSync {
    orchestrator: Arc<SyncOrchestrator>,
    network: Option<watch::Receiver<bool>>,
}

impl PeriodicSync {
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self {
            orchestrator,
            network: None,
        }
    }

    /// Skip ticks while `network` reports offline
    #[must_use]
    pub fn with_network(mut self, network: watch::Receiver<bool>) -> Self {
        self.network = Some(network);
        self
    }

    fn network_available(&self) -> bool {
        match &self.network {
            Some(rx) => *rx.borrow(),
            None => true,
        }
    }

    /// One tick: run the batch, retrying with backoff until it succeeds or
    /// the retries are used up.
    pub async fn run_once(&self) -> BatchResult {
        if !self.network_available() {
            debug!("Offline, skipping periodic sync");
            return BatchResult::Retry;
        }

        let config = self.orchestrator.config();
        // First run plus the configured retries
        let attempts = config.backoff_retries.saturating_add(1);
        let backoff = Backoff::new(attempts, config.backoff_min, config.backoff_max);

        for delay in &backoff {
            if self.orchestrator.run_periodic_tick().await == BatchResult::Success {
                return BatchResult::Success;
            }

            match delay {
                Some(delay) if self.network_available() => {
                    debug!(delay_secs = delay.as_secs(), "Periodic sync incomplete, backing off");
                    sleep(delay).await;
                }
                _ => break,
            }
        }

        warn!("Periodic sync still has pending items, waiting for next tick");
        BatchResult::Retry
    }

    /// Tick forever. The first tick fires immediately.
    pub async fn run(self) {
        let period = self.orchestrator.config().periodic_interval;
        info!(interval_secs = period.as_secs(), "Starting periodic sync");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let result = self.run_once().await;
            debug!(?result, "Periodic sync tick done");
        }
    }
}
