//! # Database
//!
//! One SQLite file holds both the bookmarks and the offline content index.
//! Foreground calls and background cache jobs write to it concurrently, so
//! the pool runs in WAL mode with a busy timeout instead of failing fast on
//! a locked database.
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("/data/quran/bookmarks.db")).await?;
//! let index = SqliteCacheIndexRepository::new(pool.clone());
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the store lives and how many connections may use it.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `sqlite:` URL of the database file, or `sqlite::memory:`
    pub database_url: String,

    /// Upper bound on pooled connections
    pub max_connections: u32,

    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,

    /// How long a statement waits on a lock held by another writer
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        Self {
            database_url: format!("sqlite:{}", path.display()),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// A private in-memory store.
    ///
    /// Every in-memory connection is its own database, so the pool is pinned
    /// to a single connection.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Open the store, creating the file if needed, and apply pending migrations.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Opening bookmark store"
    );

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(LibraryError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(config.busy_timeout)
        .create_if_missing(true);

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout);
    if config.is_in_memory() {
        // Dropping the last connection would drop the database with it
        pool_options = pool_options
            .min_connections(1)
            .max_lifetime(None)
            .idle_timeout(None);
    }

    let pool = pool_options.connect_with(options).await.map_err(|e| {
        warn!(error = %e, "Failed to open bookmark store");
        LibraryError::Database(e)
    })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| LibraryError::Migration(e.to_string()))?;
    debug!("Bookmark store migrations applied");

    Ok(pool)
}

/// In-memory store with the schema in place.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn table_exists(pool: &Pool<Sqlite>, table: &str) -> bool {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_one(pool)
                .await
                .unwrap();
        count == 1
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = create_test_pool().await.unwrap();
        assert!(table_exists(&pool, "bookmarks").await);
        assert!(table_exists(&pool, "cached_content").await);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bookmarks.db");

        let pool = create_pool(DatabaseConfig::new(&path)).await.unwrap();
        sqlx::query(
            "INSERT INTO cached_content (id, chapter, verse, downloaded_at) VALUES ('2:255', 2, 255, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;
        assert!(path.exists());

        let reopened = create_pool(DatabaseConfig::new(&path)).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cached_content")
            .fetch_one(&reopened)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&reopened)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_config() {
        let config = DatabaseConfig::new("/var/lib/quran/bookmarks.db")
            .max_connections(0)
            .busy_timeout(Duration::from_secs(1));
        assert_eq!(config.database_url, "sqlite:/var/lib/quran/bookmarks.db");
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.is_in_memory());
        assert!(DatabaseConfig::default().is_in_memory());
    }
}
