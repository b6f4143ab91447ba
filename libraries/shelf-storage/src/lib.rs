//! Shelf Sync Storage
//!
//! `SQLite` database layer holding the durable copy of every cached
//! audiobook and its embedded progress record.
//!
//! # Architecture
//!
//! - **Store as arbiter**: `upsert` is a single conditional statement, so
//!   concurrent writers (playback pause vs. sync) can never regress
//!   `last_update` for an item
//! - **Vertical Slicing**: the `audiobooks` slice owns its queries
//! - **Offline-First**: progress is written locally first and flagged
//!   `pending_upload` until the server confirms it
//!
//! # Example
//!
//! ```rust,no_run
//! use shelf_storage::{LocalProgressStore, create_pool, run_migrations};
//! use shelf_core::ProgressStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://shelf.db").await?;
//! run_migrations(&pool).await?;
//!
//! let store = LocalProgressStore::new(pool);
//! let pending = store.list_pending_upload().await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;

// Vertical slices
pub mod audiobooks;

pub use context::LocalProgressStore;
pub use error::StorageError;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://shelf.db>`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(url = %database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::debug!("SQLite pool ready");

    Ok(pool)
}
