//! Cached audiobooks and their embedded progress

use crate::error::Result;
use shelf_core::types::{AudiobookRecord, Media, ProgressRecord};
use shelf_core::UpsertOutcome;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const SELECT_COLUMNS: &str = "SELECT id, library_id, media_json,
        progress_current_time, progress_last_update, progress_duration, progress_fraction,
        progress_is_finished, progress_started_at, progress_finished_at, progress_pending_upload
     FROM audiobooks";

fn from_row(row: &SqliteRow) -> Result<AudiobookRecord> {
    let id: String = row.try_get("id")?;
    let media_json: String = row.try_get("media_json")?;
    let media: Media = serde_json::from_str(&media_json)?;

    Ok(AudiobookRecord {
        progress: ProgressRecord {
            item_id: id.clone(),
            current_time: row.try_get("progress_current_time")?,
            last_update: row.try_get("progress_last_update")?,
            duration: row.try_get("progress_duration")?,
            progress: row.try_get("progress_fraction")?,
            is_finished: row.try_get("progress_is_finished")?,
            started_at: row.try_get("progress_started_at")?,
            finished_at: row.try_get("progress_finished_at")?,
            pending_upload: row.try_get("progress_pending_upload")?,
        },
        id,
        library_id: row.try_get("library_id")?,
        media,
    })
}

/// Get one cached audiobook
pub async fn get_by_id(pool: &SqlitePool, item_id: &str) -> Result<Option<AudiobookRecord>> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(item_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// Merge-aware write
///
/// Inserts when the item is unknown. Otherwise replaces the stored record
/// only if the incoming `last_update` is at least the stored one; an older
/// write is rejected and leaves the row untouched. The comparison runs in
/// the same statement as the write, so racing callers cannot interleave
/// between check and update.
pub async fn upsert(pool: &SqlitePool, record: &AudiobookRecord) -> Result<UpsertOutcome> {
    let media_json = serde_json::to_string(&record.media)?;
    let progress = &record.progress;
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "INSERT INTO audiobooks
         (id, library_id, title, author_name, media_json,
          progress_current_time, progress_last_update, progress_duration, progress_fraction,
          progress_is_finished, progress_started_at, progress_finished_at,
          progress_pending_upload, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id)
         DO UPDATE SET
            library_id = excluded.library_id,
            title = excluded.title,
            author_name = excluded.author_name,
            media_json = excluded.media_json,
            progress_current_time = excluded.progress_current_time,
            progress_last_update = excluded.progress_last_update,
            progress_duration = excluded.progress_duration,
            progress_fraction = excluded.progress_fraction,
            progress_is_finished = excluded.progress_is_finished,
            progress_started_at = excluded.progress_started_at,
            progress_finished_at = excluded.progress_finished_at,
            progress_pending_upload = excluded.progress_pending_upload,
            cached_at = excluded.cached_at
         WHERE excluded.progress_last_update >= audiobooks.progress_last_update",
    )
    .bind(&record.id)
    .bind(&record.library_id)
    .bind(record.title())
    .bind(record.author())
    .bind(media_json)
    .bind(progress.current_time)
    .bind(progress.last_update)
    .bind(progress.duration)
    .bind(progress.progress)
    .bind(progress.is_finished)
    .bind(progress.started_at)
    .bind(progress.finished_at)
    .bind(progress.pending_upload)
    .bind(now)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        Ok(UpsertOutcome::Applied)
    } else {
        tracing::debug!(
            item_id = %record.id,
            last_update = progress.last_update,
            "Upsert rejected: stored progress is newer"
        );
        Ok(UpsertOutcome::Rejected)
    }
}

/// Records waiting for upload, most recent first
pub async fn list_pending_upload(pool: &SqlitePool) -> Result<Vec<AudiobookRecord>> {
    let rows = sqlx::query(&format!(
        "{SELECT_COLUMNS} WHERE progress_pending_upload = 1 ORDER BY progress_last_update DESC"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

/// All cached audiobooks ordered by title
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<AudiobookRecord>> {
    let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY title COLLATE NOCASE, id"))
        .fetch_all(pool)
        .await?;

    rows.iter().map(from_row).collect()
}

/// Clear the pending flag, leaving every other column as is
pub async fn mark_synced(pool: &SqlitePool, item_id: &str) -> Result<()> {
    sqlx::query("UPDATE audiobooks SET progress_pending_upload = 0 WHERE id = ?")
        .bind(item_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Clear the pending flag if the stored record is still the one uploaded
///
/// Returns `false` when the record is gone or playback has written a newer
/// position since the upload started; that newer position stays pending.
pub async fn mark_synced_at(pool: &SqlitePool, item_id: &str, last_update: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE audiobooks SET progress_pending_upload = 0
         WHERE id = ? AND progress_last_update = ?",
    )
    .bind(item_id)
    .bind(last_update)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a cached audiobook
pub async fn delete(pool: &SqlitePool, item_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM audiobooks WHERE id = ?")
        .bind(item_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
