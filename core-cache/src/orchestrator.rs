//! # Cache Orchestrator
//!
//! Use-case layer tying the resolver output, the metadata provider, the asset
//! fetcher and the cache index together.
//!
//! ## Per-verse pipeline
//!
//! 1. Return the indexed entry unless a refresh is forced.
//! 2. Fetch verse metadata. This is the only fatal step.
//! 3. Fetch the image, then the recitation when a reciter applies. Either may
//!    fail; the entry is written with whatever arrived.
//! 4. Merge the entry into the index.
//!
//! Batches are deduplicated and run with bounded concurrency, in order.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::time::{Clock, SystemClock};
use core_library::models::{CacheEntry, VerseReference};
use core_library::repositories::CacheIndexRepository;
use core_library::resolver::dedup_in_order;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{CacheConfig, NO_RECITER};
use crate::error::{CacheError, Result};
use crate::fetcher::{AssetFetcher, AssetKind};
use crate::stats::{BatchReport, CacheUsage};
use crate::traits::VerseMetadataProvider;
use crate::urls::AssetUrls;

/// Caches verse content on demand and maintains the on-disk cache.
pub struct CacheOrchestrator {
    config: CacheConfig,
    index: Arc<dyn CacheIndexRepository>,
    metadata: Arc<dyn VerseMetadataProvider>,
    fetcher: Arc<AssetFetcher>,
    urls: AssetUrls,
    clock: Arc<dyn Clock>,
}

impl CacheOrchestrator {
    pub fn new(
        config: CacheConfig,
        index: Arc<dyn CacheIndexRepository>,
        metadata: Arc<dyn VerseMetadataProvider>,
        fetcher: Arc<AssetFetcher>,
    ) -> Self {
        let urls = AssetUrls::from_config(&config);
        Self {
            config,
            index,
            metadata,
            fetcher,
            urls,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` for download timestamps and retention cutoffs.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Reciter from the configuration, `None` when audio is disabled.
    pub fn default_reciter(&self) -> Option<&str> {
        self.config.effective_reciter()
    }

    /// Validate configuration, create the cache directories and drop temp
    /// files left by an interrupted run.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        info!("Initializing offline content cache");

        self.config.validate().map_err(CacheError::Config)?;
        self.fetcher.root().ensure_directories().await.map_err(|e| {
            error!("Failed to create cache directories: {}", e);
            e
        })?;
        self.fetcher.purge_temp_files().await?;

        info!("Offline content cache ready at {}", self.fetcher.root().base().display());
        Ok(())
    }

    // ========================================================================
    // Caching
    // ========================================================================

    /// Cache one verse and return its index entry.
    ///
    /// Fails only when the index cannot be read or written or when metadata
    /// cannot be fetched. Asset failures degrade the entry instead.
    #[instrument(skip(self), fields(verse = %reference))]
    pub async fn cache_one(
        &self,
        reference: &VerseReference,
        reciter: Option<&str>,
        force_refresh: bool,
    ) -> Result<CacheEntry> {
        if !force_refresh {
            if let Some(entry) = self
                .index
                .get(reference.chapter(), reference.verse())
                .await?
            {
                debug!("Cache hit for {}", reference);
                return Ok(entry);
            }
        }

        let metadata = self.metadata.get_verse_metadata(reference).await.map_err(|e| {
            warn!("Metadata unavailable for {}: {}", reference, e);
            e
        })?;

        let image_path = match self
            .fetcher
            .fetch(AssetKind::Image, &self.urls.image_url(reference), reference)
            .await
        {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Image download failed for {}: {}", reference, e);
                None
            }
        };

        let audio_path = match reciter.filter(|r| !r.is_empty() && *r != NO_RECITER) {
            Some(reciter) => match self
                .fetcher
                .fetch(
                    AssetKind::Audio,
                    &self.urls.audio_url(reference, reciter),
                    reference,
                )
                .await
            {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Audio download failed for {}: {}", reference, e);
                    None
                }
            },
            None => None,
        };

        let entry = CacheEntry::new(reference, self.clock.now())
            .with_image(image_path)
            .with_audio(audio_path)
            .with_metadata(Some(metadata));

        let stored = self.index.put(&entry).await?;
        info!(
            image = stored.image_path.is_some(),
            audio = stored.audio_path.is_some(),
            "Cached {}",
            reference
        );
        Ok(stored)
    }

    /// Cache every distinct verse in `references`.
    ///
    /// Failures are collected per verse; the call itself never fails.
    #[instrument(skip(self, references), fields(count = references.len()))]
    pub async fn cache_many(
        &self,
        references: &[VerseReference],
        reciter: Option<&str>,
        force_refresh: bool,
    ) -> BatchReport {
        let unique = dedup_in_order(references.iter().copied());
        let mut report = BatchReport {
            requested: unique.len(),
            ..BatchReport::default()
        };

        let outcomes: Vec<_> = stream::iter(unique)
            .map(|reference| async move {
                let outcome = self.cache_one(&reference, reciter, force_refresh).await;
                (reference, outcome)
            })
            .buffered(self.config.max_concurrent_downloads.max(1))
            .collect()
            .await;

        for (reference, outcome) in outcomes {
            match outcome {
                Ok(entry) => report.cached.push(entry),
                Err(e) => {
                    warn!("Failed to cache {}: {}", reference, e);
                    report.failed.push((reference, e));
                }
            }
        }

        if !report.is_complete() {
            warn!(
                "Cached {} of {} verses",
                report.cached.len(),
                report.requested
            );
        }
        report
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn cached_entry(&self, reference: &VerseReference) -> Result<Option<CacheEntry>> {
        Ok(self
            .index
            .get(reference.chapter(), reference.verse())
            .await?)
    }

    pub async fn is_fully_cached(&self, reference: &VerseReference) -> Result<bool> {
        Ok(self
            .cached_entry(reference)
            .await?
            .is_some_and(|entry| entry.is_fully_cached()))
    }

    pub async fn entries(&self) -> Result<Vec<CacheEntry>> {
        Ok(self.index.list_all().await?)
    }

    pub async fn fully_cached(&self) -> Result<Vec<CacheEntry>> {
        Ok(self.index.list_fully_cached().await?)
    }

    pub async fn usage(&self) -> Result<CacheUsage> {
        Ok(CacheUsage {
            bytes_on_disk: self.fetcher.cache_size().await?,
            fully_cached: self.index.count_fully_cached().await?,
            entries: self.index.list_all().await?.len(),
        })
    }

    // ========================================================================
    // Eviction
    // ========================================================================

    /// Remove a verse's files and its index row.
    ///
    /// Returns `true` if there was anything to remove.
    #[instrument(skip(self), fields(verse = %reference))]
    pub async fn evict(&self, reference: &VerseReference) -> Result<bool> {
        let mut removed = false;

        if let Some(entry) = self.cached_entry(reference).await? {
            removed |= self.delete_entry_files(&entry).await?;
        }
        for kind in [AssetKind::Image, AssetKind::Audio] {
            removed |= self.fetcher.delete(kind, reference).await?;
        }
        removed |= self
            .index
            .delete(reference.chapter(), reference.verse())
            .await?;

        if removed {
            debug!("Evicted {}", reference);
        }
        Ok(removed)
    }

    async fn delete_entry_files(&self, entry: &CacheEntry) -> Result<bool> {
        let mut removed = false;
        for path in [&entry.image_path, &entry.audio_path].into_iter().flatten() {
            removed |= self.fetcher.delete_path(path).await?;
        }
        Ok(removed)
    }

    /// Delete content downloaded more than `max_age` ago.
    ///
    /// An entry exactly `max_age` old is kept. An age reaching past the
    /// earliest representable instant removes nothing.
    ///
    /// Returns the number of index rows removed.
    #[instrument(skip(self))]
    pub async fn clean_old_content(&self, max_age: Duration) -> Result<u64> {
        let threshold = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| self.clock.now().checked_sub_signed(age));
        let Some(threshold) = threshold else {
            debug!("max_age {:?} predates every entry, nothing to clean", max_age);
            return Ok(0);
        };

        for entry in self.index.find_older_than(threshold).await? {
            if let Err(e) = self.delete_entry_files(&entry).await {
                warn!("Failed to delete files of {}: {}", entry.id, e);
            }
        }

        let removed = self.index.delete_older_than(threshold).await?;
        info!("Removed {} entries older than {}", removed, threshold);
        Ok(removed)
    }

    /// [`clean_old_content`](Self::clean_old_content) with the configured retention.
    pub async fn clean_expired(&self) -> Result<u64> {
        self.clean_old_content(self.config.retention).await
    }

    /// Delete every cached file and index row.
    ///
    /// Returns the number of index rows removed.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<u64> {
        let files = self.fetcher.clear_all().await?;

        let mut rows = 0;
        for entry in self.index.list_all().await? {
            if self.index.delete(entry.chapter, entry.verse).await? {
                rows += 1;
            }
        }

        info!("Cleared cache: {} files, {} entries", files, rows);
        Ok(rows)
    }
}
