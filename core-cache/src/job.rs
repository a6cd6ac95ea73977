//! # Bookmark Cache Jobs
//!
//! Background caching of whole bookmarks.
//!
//! [`BookmarkCacheScheduler`] resolves a bookmark into the verses it needs,
//! adds the opening formula when required and submits one unique work request
//! per bookmark. Resubmitting for the same bookmark replaces any pending
//! request. [`BookmarkCacheJob`] is the worker that runs the request through
//! [`CacheOrchestrator::cache_many`].

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::background::{
    BackgroundExecutor, ExistingWorkPolicy, TaskConstraints, TaskId, WorkHandler, WorkOutcome,
    WorkRequest,
};
use core_library::models::{Bookmark, BookmarkId, VerseReference};
use core_library::repositories::BookmarkRepository;
use core_library::resolver::resolve_for_caching;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{CacheError, Result};
use crate::orchestrator::CacheOrchestrator;

/// Worker name the job is registered under.
pub const CACHE_BOOKMARK_WORKER: &str = "cache_bookmark";

/// Tag carried by every bookmark cache request.
pub const CACHE_BOOKMARK_TAG: &str = "cache_bookmark";

/// Unique work name for `bookmark_id`.
pub fn work_name(bookmark_id: BookmarkId) -> String {
    format!("cache_bookmark_{}", bookmark_id)
}

/// Per-bookmark tag.
pub fn bookmark_tag(bookmark_id: BookmarkId) -> String {
    format!("bookmark_{}", bookmark_id)
}

/// Input of [`BookmarkCacheJob`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkCachePayload {
    pub bookmark_id: i64,
    /// Reciter edition, `None` for images and metadata only
    pub reciter_edition: Option<String>,
    /// `"chapter:verse"` ids, deduplicated, opening formula included
    pub verses: Vec<String>,
}

impl BookmarkCachePayload {
    pub fn new(
        bookmark_id: BookmarkId,
        reciter_edition: Option<String>,
        verses: &[VerseReference],
    ) -> Self {
        Self {
            bookmark_id: bookmark_id.0,
            reciter_edition,
            verses: verses.iter().map(VerseReference::cache_id).collect(),
        }
    }

    pub fn references(&self) -> Result<Vec<VerseReference>> {
        self.verses
            .iter()
            .map(|id| id.parse::<VerseReference>().map_err(CacheError::from))
            .collect()
    }
}

/// Result of [`BookmarkCacheScheduler::schedule_many`]
#[derive(Debug, Default)]
pub struct ScheduleReport {
    pub scheduled: Vec<(BookmarkId, TaskId)>,
    pub failed: Vec<(BookmarkId, CacheError)>,
}

/// Submits bookmark cache jobs to the background executor.
pub struct BookmarkCacheScheduler {
    bookmarks: Arc<dyn BookmarkRepository>,
    executor: Arc<dyn BackgroundExecutor>,
    default_reciter: Option<String>,
}

impl BookmarkCacheScheduler {
    pub fn new(
        bookmarks: Arc<dyn BookmarkRepository>,
        executor: Arc<dyn BackgroundExecutor>,
        default_reciter: Option<String>,
    ) -> Self {
        Self {
            bookmarks,
            executor,
            default_reciter,
        }
    }

    /// Schedule caching of a stored bookmark with the default reciter.
    pub async fn schedule_bookmark_cache(&self, bookmark_id: BookmarkId) -> Result<TaskId> {
        let reciter = self.default_reciter.clone();
        self.schedule_bookmark_cache_with_reciter(bookmark_id, reciter)
            .await
    }

    pub async fn schedule_bookmark_cache_with_reciter(
        &self,
        bookmark_id: BookmarkId,
        reciter: Option<String>,
    ) -> Result<TaskId> {
        let bookmark = self
            .bookmarks
            .find_by_id(bookmark_id)
            .await?
            .ok_or_else(|| CacheError::NotFound {
                entity_type: "Bookmark".to_string(),
                id: bookmark_id.to_string(),
            })?;
        self.schedule_for(&bookmark, reciter).await
    }

    /// Resolve `bookmark` and submit its cache job, replacing a pending one.
    #[instrument(skip(self, bookmark), fields(bookmark_id = %bookmark.id))]
    pub async fn schedule_for(
        &self,
        bookmark: &Bookmark,
        reciter: Option<String>,
    ) -> Result<TaskId> {
        let id = bookmark.id;
        if id.0 <= 0 {
            return Err(CacheError::InvalidInput(
                "cannot schedule an unsaved bookmark".to_string(),
            ));
        }

        let verses = resolve_for_caching(bookmark)?;
        let payload = BookmarkCachePayload::new(id, reciter, &verses);
        let payload = serde_json::to_value(&payload)
            .map_err(|e| CacheError::Scheduling(format!("Failed to encode payload: {}", e)))?;

        let request = WorkRequest::new(work_name(id), CACHE_BOOKMARK_WORKER)
            .with_tag(CACHE_BOOKMARK_TAG)
            .with_tag(bookmark_tag(id))
            // Cache jobs always need a connection
            .with_constraints(TaskConstraints::default())
            .with_payload(payload);

        let task_id = self
            .executor
            .enqueue_unique_work(request, ExistingWorkPolicy::Replace)
            .await
            .map_err(|e| {
                error!("Failed to schedule cache job for bookmark {}: {}", id, e);
                CacheError::Scheduling(e.to_string())
            })?;

        info!(
            "Scheduled caching of {} verses for bookmark {} as {}",
            verses.len(),
            id,
            task_id
        );
        Ok(task_id)
    }

    /// Schedule several bookmarks, continuing past individual failures.
    pub async fn schedule_many(&self, bookmark_ids: &[BookmarkId]) -> ScheduleReport {
        let mut report = ScheduleReport::default();
        for &id in bookmark_ids {
            match self.schedule_bookmark_cache(id).await {
                Ok(task_id) => report.scheduled.push((id, task_id)),
                Err(e) => {
                    warn!("Skipping bookmark {}: {}", id, e);
                    report.failed.push((id, e));
                }
            }
        }
        report
    }

    /// Cancel the pending cache job of `bookmark_id`, if any.
    pub async fn cancel(&self, bookmark_id: BookmarkId) -> Result<bool> {
        self.executor
            .cancel_unique_work(&work_name(bookmark_id))
            .await
            .map_err(|e| CacheError::Scheduling(e.to_string()))
    }
}

/// Worker that caches the verses named in a [`BookmarkCachePayload`].
pub struct BookmarkCacheJob {
    orchestrator: Arc<CacheOrchestrator>,
}

impl BookmarkCacheJob {
    pub fn new(orchestrator: Arc<CacheOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl WorkHandler for BookmarkCacheJob {
    async fn run(&self, payload: &serde_json::Value) -> WorkOutcome {
        let payload: BookmarkCachePayload = match serde_json::from_value(payload.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Malformed bookmark cache payload: {}", e);
                return WorkOutcome::Failure;
            }
        };

        let references = match payload.references() {
            Ok(references) => references,
            Err(e) => {
                error!(
                    "Invalid verse in payload for bookmark {}: {}",
                    payload.bookmark_id, e
                );
                return WorkOutcome::Failure;
            }
        };

        if references.is_empty() {
            debug!("Nothing to cache for bookmark {}", payload.bookmark_id);
            return WorkOutcome::Success;
        }

        let report = self
            .orchestrator
            .cache_many(&references, payload.reciter_edition.as_deref(), false)
            .await;

        if report.cached.is_empty() {
            warn!(
                "Cached none of {} verses for bookmark {}, retrying",
                report.requested, payload.bookmark_id
            );
            return WorkOutcome::Retry;
        }

        if !report.is_complete() {
            warn!(
                "Cached {} of {} verses for bookmark {}",
                report.cached.len(),
                report.requested,
                payload.bookmark_id
            );
        } else {
            info!(
                "Cached {} verses for bookmark {}",
                report.cached.len(),
                payload.bookmark_id
            );
        }
        WorkOutcome::Success
    }
}
