/// `ProgressStore` implementation over a `SQLite` pool
use crate::audiobooks;
use async_trait::async_trait;
use shelf_core::types::AudiobookRecord;
use shelf_core::{ProgressStore, UpsertOutcome};
use sqlx::SqlitePool;

/// Local progress store
///
/// Cheap to clone; all clones share the same pool.
#[derive(Clone)]
pub struct LocalProgressStore {
    pool: SqlitePool,
}

impl LocalProgressStore {
    /// Create a store over an already migrated pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) and migrate the database at `database_url`
    pub async fn open(database_url: &str) -> crate::error::Result<Self> {
        let pool = crate::create_pool(database_url).await?;
        crate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// All cached audiobooks ordered by title
    pub async fn list_all(&self) -> shelf_core::Result<Vec<AudiobookRecord>> {
        Ok(audiobooks::list_all(&self.pool).await?)
    }

    /// Delete a cached audiobook
    pub async fn delete(&self, item_id: &str) -> shelf_core::Result<bool> {
        Ok(audiobooks::delete(&self.pool, item_id).await?)
    }
}

#[async_trait]
impl ProgressStore for LocalProgressStore {
    async fn get_by_id(&self, item_id: &str) -> shelf_core::Result<Option<AudiobookRecord>> {
        Ok(audiobooks::get_by_id(&self.pool, item_id).await?)
    }

    async fn upsert(&self, record: &AudiobookRecord) -> shelf_core::Result<UpsertOutcome> {
        Ok(audiobooks::upsert(&self.pool, record).await?)
    }

    async fn list_pending_upload(&self) -> shelf_core::Result<Vec<AudiobookRecord>> {
        Ok(audiobooks::list_pending_upload(&self.pool).await?)
    }

    async fn mark_synced(&self, item_id: &str) -> shelf_core::Result<()> {
        Ok(audiobooks::mark_synced(&self.pool, item_id).await?)
    }

    async fn mark_synced_at(&self, item_id: &str, last_update: i64) -> shelf_core::Result<bool> {
        Ok(audiobooks::mark_synced_at(&self.pool, item_id, last_update).await?)
    }
}
