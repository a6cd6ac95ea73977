//! # Engine Wiring
//!
//! Assembles the offline content engine from a [`CoreConfig`]: opens the
//! database, builds the repositories, the asset fetcher and the orchestrator,
//! and registers the bookmark cache worker with the background executor.

use std::sync::Arc;

use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::{
    BookmarkRepository, CacheIndexRepository, SqliteBookmarkRepository,
    SqliteCacheIndexRepository,
};
use core_runtime::config::CoreConfig;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::fetcher::{AssetFetcher, CacheRoot};
use crate::job::{BookmarkCacheJob, BookmarkCacheScheduler, CACHE_BOOKMARK_WORKER};
use crate::metadata::HttpVerseMetadataProvider;
use crate::orchestrator::CacheOrchestrator;
use crate::reclaimer::OrphanReclaimer;
use crate::traits::VerseMetadataProvider;

/// The assembled engine.
pub struct OfflineContentEngine {
    pool: SqlitePool,
    bookmarks: Arc<dyn BookmarkRepository>,
    orchestrator: Arc<CacheOrchestrator>,
    scheduler: Option<BookmarkCacheScheduler>,
    reclaimer: OrphanReclaimer,
}

impl OfflineContentEngine {
    /// Build the engine with the HTTP metadata provider.
    ///
    /// `core.default_reciter` takes precedence over the reciter in
    /// `cache_config`.
    #[instrument(skip(core, cache_config), fields(cache_dir = %core.cache_dir.display()))]
    pub async fn build(core: &CoreConfig, cache_config: CacheConfig) -> Result<Self> {
        let metadata: Arc<dyn VerseMetadataProvider> = Arc::new(HttpVerseMetadataProvider::new(
            core.http_client.clone(),
            cache_config.metadata_base_url.clone(),
        ));
        Self::build_with_metadata(core, cache_config, metadata).await
    }

    /// Build the engine around a caller supplied metadata source.
    pub async fn build_with_metadata(
        core: &CoreConfig,
        cache_config: CacheConfig,
        metadata: Arc<dyn VerseMetadataProvider>,
    ) -> Result<Self> {
        core.validate()
            .map_err(|e| CacheError::Config(e.to_string()))?;
        let cache_config = cache_config.with_default_reciter(core.default_reciter.clone());

        let pool = create_pool(DatabaseConfig::new(&core.database_path)).await?;
        let bookmarks: Arc<dyn BookmarkRepository> =
            Arc::new(SqliteBookmarkRepository::new(pool.clone()));
        let index: Arc<dyn CacheIndexRepository> =
            Arc::new(SqliteCacheIndexRepository::new(pool.clone()));

        let fetcher = AssetFetcher::new(
            CacheRoot::from_config(&core.cache_dir, &cache_config),
            core.http_client.clone(),
            cache_config.download_timeout,
        );
        let default_reciter = cache_config.effective_reciter().map(str::to_string);
        let orchestrator = Arc::new(CacheOrchestrator::new(
            cache_config,
            index,
            metadata,
            Arc::new(fetcher),
        ));
        orchestrator.initialize().await?;

        let executor = core.background_executor.clone();
        let scheduler = match executor.as_ref() {
            Some(executor) if core.features.enable_background_caching => {
                executor
                    .register_worker(
                        CACHE_BOOKMARK_WORKER,
                        Arc::new(BookmarkCacheJob::new(orchestrator.clone())),
                    )
                    .await
                    .map_err(|e| CacheError::Scheduling(e.to_string()))?;

                Some(BookmarkCacheScheduler::new(
                    bookmarks.clone(),
                    executor.clone(),
                    default_reciter,
                ))
            }
            _ => None,
        };

        let reclaimer = OrphanReclaimer::new(
            bookmarks.clone(),
            orchestrator.clone(),
            // Executors are only shared with the reclaimer when jobs can exist
            executor.filter(|_| scheduler.is_some()),
        );

        info!(
            background_caching = scheduler.is_some(),
            "Offline content engine ready"
        );

        Ok(Self {
            pool,
            bookmarks,
            orchestrator,
            scheduler,
            reclaimer,
        })
    }

    pub fn bookmarks(&self) -> Arc<dyn BookmarkRepository> {
        self.bookmarks.clone()
    }

    pub fn orchestrator(&self) -> Arc<CacheOrchestrator> {
        self.orchestrator.clone()
    }

    /// `None` unless background caching is enabled.
    pub fn scheduler(&self) -> Option<&BookmarkCacheScheduler> {
        self.scheduler.as_ref()
    }

    pub fn reclaimer(&self) -> &OrphanReclaimer {
        &self.reclaimer
    }

    /// Close the database pool.
    pub async fn shutdown(&self) {
        self.pool.close().await;
    }
}
