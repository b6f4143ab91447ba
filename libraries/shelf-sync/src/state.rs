use crate::types::{SyncEvent, SyncState};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::trace;

const EVENT_CAPACITY: usize = 64;

/// Per-item sync states plus the event channel that reports them
pub struct SyncStates {
    states: Mutex<HashMap<String, SyncState>>,
    events: broadcast::Sender<SyncEvent>,
}

impl Default for SyncStates {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStates {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            states: Mutex::new(HashMap::new()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SyncState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, item_id: &str) -> SyncState {
        self.lock().get(item_id).copied().unwrap_or_default()
    }

    /// Set a state, emitting `StateChanged` if it differs
    pub fn set(&self, item_id: &str, state: SyncState) {
        let previous = {
            let mut states = self.lock();
            if state == SyncState::Idle {
                states.remove(item_id)
            } else {
                states.insert(item_id.to_string(), state)
            }
        };

        if previous.unwrap_or_default() != state {
            trace!(item_id = %item_id, ?state, "Sync state changed");
            self.emit(SyncEvent::StateChanged {
                item_id: item_id.to_string(),
                state,
            });
        }
    }

    pub fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Enter `Reconciling` for `item_id`.
    ///
    /// If the returned guard is dropped without [`ReconcileGuard::finish`],
    /// the item falls back to its fallback state, initially the state it
    /// had before.
    pub fn begin(&self, item_id: &str) -> ReconcileGuard<'_> {
        // Never fall back into another operation's Reconciling
        let fallback = match self.get(item_id) {
            SyncState::Reconciling => SyncState::Idle,
            state => state,
        };
        self.set(item_id, SyncState::Reconciling);
        ReconcileGuard {
            states: self,
            item_id: item_id.to_string(),
            fallback,
            finished: false,
        }
    }
}

/// Holds an item in `Reconciling`
pub struct ReconcileGuard<'a> {
    states: &'a SyncStates,
    item_id: String,
    fallback: SyncState,
    finished: bool,
}

impl ReconcileGuard<'_> {
    /// State to restore if the operation is abandoned
    pub fn set_fallback(&mut self, state: SyncState) {
        self.fallback = state;
    }

    /// Leave `Reconciling` for `state`
    pub fn finish(mut self, state: SyncState) {
        self.finished = true;
        self.states.set(&self.item_id, state);
    }
}

impl Drop for ReconcileGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.states.set(&self.item_id, self.fallback);
        }
    }
}

/// Resting state for a record's pending flag
pub fn resting_state(pending_upload: bool) -> SyncState {
    if pending_upload {
        SyncState::UploadPending
    } else {
        SyncState::Idle
    }
}
