//! Bookmark repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{Bookmark, BookmarkId, BookmarkKind};
use crate::repositories::column_u16;
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, SqlitePool};
use tracing::{debug, instrument};

/// Bookmark repository interface for data access operations
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// Insert a new bookmark and return it with its assigned id
    async fn create(&self, bookmark: &Bookmark) -> Result<Bookmark>;

    /// Find a bookmark by its ID
    ///
    /// # Returns
    /// - `Ok(Some(bookmark))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: BookmarkId) -> Result<Option<Bookmark>>;

    /// Update an existing bookmark
    ///
    /// # Errors
    /// Returns `NotFound` if no bookmark has the given id
    async fn update(&self, bookmark: &Bookmark) -> Result<()>;

    /// Delete a bookmark by ID
    ///
    /// # Returns
    /// - `Ok(true)` if deleted
    /// - `Ok(false)` if not found
    async fn delete(&self, id: BookmarkId) -> Result<bool>;

    /// All bookmarks in creation order
    async fn list_all(&self) -> Result<Vec<Bookmark>>;

    /// Bookmarks of one group in creation order
    async fn list_by_group(&self, group_id: i64) -> Result<Vec<Bookmark>>;

    /// Count total bookmarks
    async fn count(&self) -> Result<i64>;
}

#[derive(Debug, FromRow)]
struct BookmarkRow {
    id: i64,
    group_id: i64,
    kind: String,
    start_chapter: i64,
    start_verse: i64,
    end_chapter: i64,
    end_verse: i64,
    description: String,
    tags: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<BookmarkRow> for Bookmark {
    type Error = LibraryError;

    fn try_from(row: BookmarkRow) -> Result<Self> {
        Ok(Bookmark {
            id: BookmarkId(row.id),
            group_id: row.group_id,
            kind: row.kind.parse::<BookmarkKind>()?,
            start_chapter: column_u16("start_chapter", row.start_chapter)?,
            start_verse: column_u16("start_verse", row.start_verse)?,
            end_chapter: column_u16("end_chapter", row.end_chapter)?,
            end_verse: column_u16("end_verse", row.end_verse)?,
            description: row.description,
            tags: serde_json::from_str(&row.tags)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn validate(bookmark: &Bookmark) -> Result<()> {
    bookmark
        .validate()
        .map_err(|message| LibraryError::InvalidInput {
            field: "Bookmark".to_string(),
            message,
        })
}

fn into_bookmarks(rows: Vec<BookmarkRow>) -> Result<Vec<Bookmark>> {
    rows.into_iter().map(Bookmark::try_from).collect()
}

/// SQLite implementation of BookmarkRepository
pub struct SqliteBookmarkRepository {
    pool: SqlitePool,
}

impl SqliteBookmarkRepository {
    /// Create a new SqliteBookmarkRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookmarkRepository for SqliteBookmarkRepository {
    #[instrument(skip(self, bookmark), fields(kind = bookmark.kind.as_str()))]
    async fn create(&self, bookmark: &Bookmark) -> Result<Bookmark> {
        validate(bookmark)?;

        let result = query(
            r#"
            INSERT INTO bookmarks (
                group_id, kind, start_chapter, start_verse, end_chapter, end_verse,
                description, tags, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(bookmark.group_id)
        .bind(bookmark.kind.as_str())
        .bind(bookmark.start_chapter as i64)
        .bind(bookmark.start_verse as i64)
        .bind(bookmark.end_chapter as i64)
        .bind(bookmark.end_verse as i64)
        .bind(&bookmark.description)
        .bind(serde_json::to_string(&bookmark.tags)?)
        .bind(bookmark.created_at)
        .bind(bookmark.updated_at)
        .execute(&self.pool)
        .await?;

        let mut created = bookmark.clone();
        created.id = BookmarkId(result.last_insert_rowid());
        debug!(id = %created.id, "Bookmark created");
        Ok(created)
    }

    async fn find_by_id(&self, id: BookmarkId) -> Result<Option<Bookmark>> {
        let row = query_as::<_, BookmarkRow>("SELECT * FROM bookmarks WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Bookmark::try_from).transpose()
    }

    async fn update(&self, bookmark: &Bookmark) -> Result<()> {
        validate(bookmark)?;

        let result = query(
            r#"
            UPDATE bookmarks
            SET group_id = ?, kind = ?, start_chapter = ?, start_verse = ?, end_chapter = ?,
                end_verse = ?, description = ?, tags = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(bookmark.group_id)
        .bind(bookmark.kind.as_str())
        .bind(bookmark.start_chapter as i64)
        .bind(bookmark.start_verse as i64)
        .bind(bookmark.end_chapter as i64)
        .bind(bookmark.end_verse as i64)
        .bind(&bookmark.description)
        .bind(serde_json::to_string(&bookmark.tags)?)
        .bind(bookmark.updated_at)
        .bind(bookmark.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Bookmark".to_string(),
                id: bookmark.id.to_string(),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: BookmarkId) -> Result<bool> {
        let result = query("DELETE FROM bookmarks WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<Bookmark>> {
        let rows =
            query_as::<_, BookmarkRow>("SELECT * FROM bookmarks ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;

        into_bookmarks(rows)
    }

    async fn list_by_group(&self, group_id: i64) -> Result<Vec<Bookmark>> {
        let rows = query_as::<_, BookmarkRow>(
            "SELECT * FROM bookmarks WHERE group_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        into_bookmarks(rows)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM bookmarks")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
