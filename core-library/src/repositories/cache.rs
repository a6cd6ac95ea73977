//! Cache index repository
//!
//! One row per verse in `cached_content`, keyed by `"chapter:verse"`. Writes
//! are merges: a `put` carrying only an image path never erases an audio path
//! written earlier, so independent partial writers commute.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow, SqlitePool};
use tracing::{debug, error, instrument};

use crate::error::{LibraryError, Result};
use crate::models::{CacheEntry, VerseMetadata};
use crate::repositories::column_u16;

const SELECT_COLUMNS: &str =
    "SELECT id, chapter, verse, image_path, audio_path, metadata, downloaded_at FROM cached_content";

/// Repository trait for the offline content index.
#[async_trait]
pub trait CacheIndexRepository: Send + Sync {
    /// Entry for `chapter:verse`, if any.
    async fn get(&self, chapter: u16, verse: u16) -> Result<Option<CacheEntry>>;

    /// Entry by its `"chapter:verse"` id, if any.
    async fn get_by_id(&self, id: &str) -> Result<Option<CacheEntry>>;

    /// Insert or merge `entry` and return the stored row.
    ///
    /// Present fields of `entry` win; absent paths and metadata keep the
    /// previously stored value. `downloaded_at` is always overwritten.
    async fn put(&self, entry: &CacheEntry) -> Result<CacheEntry>;

    /// Remove the entry for `chapter:verse`. Returns whether a row existed.
    async fn delete(&self, chapter: u16, verse: u16) -> Result<bool>;

    /// Entries that have both an image and a recitation, in mushaf order.
    async fn list_fully_cached(&self) -> Result<Vec<CacheEntry>>;

    async fn count_fully_cached(&self) -> Result<i64>;

    /// Entries downloaded strictly before `threshold`.
    async fn find_older_than(&self, threshold: DateTime<Utc>) -> Result<Vec<CacheEntry>>;

    /// Delete entries downloaded strictly before `threshold`. Returns the
    /// number of rows removed.
    async fn delete_older_than(&self, threshold: DateTime<Utc>) -> Result<u64>;

    /// Every entry, in mushaf order.
    async fn list_all(&self) -> Result<Vec<CacheEntry>>;
}

#[derive(Debug, FromRow)]
struct CacheEntryRow {
    id: String,
    chapter: i64,
    verse: i64,
    image_path: Option<String>,
    audio_path: Option<String>,
    metadata: Option<String>,
    downloaded_at: i64,
}

impl TryFrom<CacheEntryRow> for CacheEntry {
    type Error = LibraryError;

    fn try_from(row: CacheEntryRow) -> Result<Self> {
        let metadata = row
            .metadata
            .as_deref()
            .map(serde_json::from_str::<VerseMetadata>)
            .transpose()?;
        let downloaded_at = DateTime::<Utc>::from_timestamp_millis(row.downloaded_at).ok_or_else(
            || LibraryError::InvalidInput {
                field: "downloaded_at".to_string(),
                message: format!("invalid timestamp {}", row.downloaded_at),
            },
        )?;

        Ok(CacheEntry {
            id: row.id,
            chapter: column_u16("chapter", row.chapter)?,
            verse: column_u16("verse", row.verse)?,
            image_path: row.image_path.map(PathBuf::from),
            audio_path: row.audio_path.map(PathBuf::from),
            metadata,
            downloaded_at,
        })
    }
}

fn path_column(field: &str, path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| {
        p.to_str()
            .map(str::to_owned)
            .ok_or_else(|| LibraryError::InvalidInput {
                field: field.to_string(),
                message: format!("path is not valid UTF-8: {}", p.display()),
            })
    })
    .transpose()
}

fn into_entries(rows: Vec<CacheEntryRow>) -> Result<Vec<CacheEntry>> {
    rows.into_iter().map(CacheEntry::try_from).collect()
}

/// SQLite implementation of CacheIndexRepository.
pub struct SqliteCacheIndexRepository {
    pool: SqlitePool,
}

impl SqliteCacheIndexRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheIndexRepository for SqliteCacheIndexRepository {
    #[instrument(skip(self))]
    async fn get(&self, chapter: u16, verse: u16) -> Result<Option<CacheEntry>> {
        let row = query_as::<_, CacheEntryRow>(&format!(
            "{} WHERE chapter = ? AND verse = ?",
            SELECT_COLUMNS
        ))
        .bind(chapter as i64)
        .bind(verse as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CacheEntry::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Option<CacheEntry>> {
        let row = query_as::<_, CacheEntryRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CacheEntry::try_from).transpose()
    }

    #[instrument(skip(self, entry), fields(id = %entry.id))]
    async fn put(&self, entry: &CacheEntry) -> Result<CacheEntry> {
        let reference = entry.reference()?;
        if reference.cache_id() != entry.id {
            return Err(LibraryError::InvalidInput {
                field: "id".to_string(),
                message: format!(
                    "id {} does not match {}:{}",
                    entry.id, entry.chapter, entry.verse
                ),
            });
        }

        let metadata = entry
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let row = query_as::<_, CacheEntryRow>(
            r#"
            INSERT INTO cached_content (
                id, chapter, verse, image_path, audio_path, metadata, downloaded_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                image_path = COALESCE(excluded.image_path, cached_content.image_path),
                audio_path = COALESCE(excluded.audio_path, cached_content.audio_path),
                metadata = COALESCE(excluded.metadata, cached_content.metadata),
                downloaded_at = excluded.downloaded_at
            RETURNING id, chapter, verse, image_path, audio_path, metadata, downloaded_at
            "#,
        )
        .bind(&entry.id)
        .bind(entry.chapter as i64)
        .bind(entry.verse as i64)
        .bind(path_column("image_path", entry.image_path.as_deref())?)
        .bind(path_column("audio_path", entry.audio_path.as_deref())?)
        .bind(metadata)
        .bind(entry.downloaded_at.timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to upsert cache entry {}: {}", entry.id, e);
            LibraryError::Database(e)
        })?;

        let stored = CacheEntry::try_from(row)?;
        debug!(
            fully_cached = stored.is_fully_cached(),
            "Cache entry stored"
        );
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn delete(&self, chapter: u16, verse: u16) -> Result<bool> {
        let result = query("DELETE FROM cached_content WHERE chapter = ? AND verse = ?")
            .bind(chapter as i64)
            .bind(verse as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete cache entry {}:{}: {}", chapter, verse, e);
                LibraryError::Database(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list_fully_cached(&self) -> Result<Vec<CacheEntry>> {
        let rows = query_as::<_, CacheEntryRow>(&format!(
            "{} WHERE image_path IS NOT NULL AND audio_path IS NOT NULL ORDER BY chapter, verse",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        into_entries(rows)
    }

    #[instrument(skip(self))]
    async fn count_fully_cached(&self) -> Result<i64> {
        let count: i64 = query_as(
            "SELECT COUNT(*) FROM cached_content WHERE image_path IS NOT NULL AND audio_path IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map(|row: (i64,)| row.0)?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn find_older_than(&self, threshold: DateTime<Utc>) -> Result<Vec<CacheEntry>> {
        let rows = query_as::<_, CacheEntryRow>(&format!(
            "{} WHERE downloaded_at < ? ORDER BY chapter, verse",
            SELECT_COLUMNS
        ))
        .bind(threshold.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        into_entries(rows)
    }

    #[instrument(skip(self))]
    async fn delete_older_than(&self, threshold: DateTime<Utc>) -> Result<u64> {
        let result = query("DELETE FROM cached_content WHERE downloaded_at < ?")
            .bind(threshold.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete stale cache entries: {}", e);
                LibraryError::Database(e)
            })?;

        debug!(removed = result.rows_affected(), "Stale cache entries deleted");
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<CacheEntry>> {
        let rows =
            query_as::<_, CacheEntryRow>(&format!("{} ORDER BY chapter, verse", SELECT_COLUMNS))
                .fetch_all(&self.pool)
                .await?;

        into_entries(rows)
    }
}
