mod connectivity;
mod error;
mod events;
mod orchestrator;
mod periodic;
pub mod reconciler;
mod session;
mod state;
mod types;

// Public exports
pub use connectivity::ConnectivityMonitor;
pub use error::{Result, SyncError};
pub use events::PlaybackEvent;
pub use orchestrator::SyncOrchestrator;
pub use periodic::PeriodicSync;
pub use reconciler::{reconcile, reconcile_item, ItemResolution, ReconcileOutcome, UploadRequest};
pub use session::{PlaybackSession, SessionState};
pub use state::{resting_state, ReconcileGuard, SyncStates};
pub use types::{
    BatchResult, OpenedItem, RemoteStatus, SyncConfig, SyncEvent, SyncOutcome, SyncState,
};
