//! # Orphan Reclaimer
//!
//! Removes cached verses that no remaining bookmark refers to.
//!
//! When a bookmark is deleted its pending cache job is cancelled, then every
//! remaining bookmark is resolved to build the set of verses still in use.
//! Verses of the deleted bookmark outside that set are evicted. If any
//! remaining bookmark fails to resolve, nothing is evicted.

use std::collections::HashSet;
use std::sync::Arc;

use bridge_traits::background::BackgroundExecutor;
use core_library::models::{Bookmark, BookmarkId, VerseReference};
use core_library::repositories::BookmarkRepository;
use core_library::resolver::resolve_for_caching;
use tracing::{debug, info, instrument, warn};

use crate::error::{CacheError, Result};
use crate::job::work_name;
use crate::orchestrator::CacheOrchestrator;

/// What a reclaim pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReclaimReport {
    /// A pending cache job was cancelled
    pub cancelled_job: bool,
    /// Verses considered for eviction
    pub candidates: usize,
    /// Ids of evicted verses
    pub evicted: Vec<String>,
    /// Candidates kept because another bookmark still refers to them
    pub retained: usize,
    /// Candidates whose eviction failed
    pub failed: usize,
}

/// Reclaims cache space held by deleted bookmarks.
pub struct OrphanReclaimer {
    bookmarks: Arc<dyn BookmarkRepository>,
    orchestrator: Arc<CacheOrchestrator>,
    executor: Option<Arc<dyn BackgroundExecutor>>,
}

impl OrphanReclaimer {
    pub fn new(
        bookmarks: Arc<dyn BookmarkRepository>,
        orchestrator: Arc<CacheOrchestrator>,
        executor: Option<Arc<dyn BackgroundExecutor>>,
    ) -> Self {
        Self {
            bookmarks,
            orchestrator,
            executor,
        }
    }

    /// Delete a stored bookmark and reclaim its cache.
    pub async fn delete_bookmark(&self, id: BookmarkId) -> Result<ReclaimReport> {
        let bookmark = self
            .bookmarks
            .find_by_id(id)
            .await?
            .ok_or_else(|| CacheError::NotFound {
                entity_type: "Bookmark".to_string(),
                id: id.to_string(),
            })?;

        self.bookmarks.delete(id).await?;
        self.on_bookmark_deleted(&bookmark).await
    }

    /// Reclaim after `deleted` has been removed from the repository.
    #[instrument(skip(self, deleted), fields(bookmark_id = %deleted.id))]
    pub async fn on_bookmark_deleted(&self, deleted: &Bookmark) -> Result<ReclaimReport> {
        let mut report = ReclaimReport {
            cancelled_job: self.cancel_pending(deleted.id).await,
            ..ReclaimReport::default()
        };

        let candidates = resolve_for_caching(deleted)?;
        report.candidates = candidates.len();
        if candidates.is_empty() {
            return Ok(report);
        }

        let kept = self.referenced_verses(Some(deleted.id)).await?;
        for reference in candidates {
            if kept.contains(&reference) {
                report.retained += 1;
                continue;
            }
            self.evict_into(&reference, &mut report).await;
        }

        info!(
            "Reclaimed {} of {} verses for bookmark {}",
            report.evicted.len(),
            report.candidates,
            deleted.id
        );
        Ok(report)
    }

    /// Evict every cached verse no bookmark refers to.
    #[instrument(skip(self))]
    pub async fn sweep_orphans(&self) -> Result<ReclaimReport> {
        let kept = self.referenced_verses(None).await?;
        let mut report = ReclaimReport::default();

        for entry in self.orchestrator.entries().await? {
            let reference = match entry.reference() {
                Ok(reference) => reference,
                Err(e) => {
                    warn!("Skipping unreadable cache entry {}: {}", entry.id, e);
                    report.failed += 1;
                    continue;
                }
            };
            report.candidates += 1;
            if kept.contains(&reference) {
                report.retained += 1;
            } else {
                self.evict_into(&reference, &mut report).await;
            }
        }

        info!(
            "Orphan sweep evicted {} of {} cached verses",
            report.evicted.len(),
            report.candidates
        );
        Ok(report)
    }

    async fn cancel_pending(&self, id: BookmarkId) -> bool {
        let Some(executor) = self.executor.as_ref() else {
            return false;
        };
        match executor.cancel_unique_work(&work_name(id)).await {
            Ok(cancelled) => cancelled,
            Err(e) => {
                warn!("Failed to cancel cache job for bookmark {}: {}", id, e);
                false
            }
        }
    }

    /// Union of the cache sets of all stored bookmarks except `excluding`.
    async fn referenced_verses(
        &self,
        excluding: Option<BookmarkId>,
    ) -> Result<HashSet<VerseReference>> {
        let mut kept = HashSet::new();
        for bookmark in self.bookmarks.list_all().await? {
            if Some(bookmark.id) == excluding {
                continue;
            }
            let references = resolve_for_caching(&bookmark).map_err(|e| {
                warn!(
                    "Bookmark {} does not resolve, aborting reclaim: {}",
                    bookmark.id, e
                );
                CacheError::from(e)
            })?;
            kept.extend(references);
        }
        debug!("{} verses still referenced", kept.len());
        Ok(kept)
    }

    async fn evict_into(&self, reference: &VerseReference, report: &mut ReclaimReport) {
        match self.orchestrator.evict(reference).await {
            Ok(true) => report.evicted.push(reference.cache_id()),
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to evict {}: {}", reference, e);
                report.failed += 1;
            }
        }
    }
}
