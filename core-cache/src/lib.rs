//! # Offline Content Cache
//!
//! Downloads and indexes the content a bookmark needs to be read offline:
//! the rendered image of every verse, its recitation, and its metadata.
//!
//! ## Overview
//!
//! - [`urls`] - Remote locations of verse images and recitations
//! - [`fetcher`] - Atomic, idempotent streaming of assets into the cache root
//! - [`metadata`] - HTTP source of per-verse metadata
//! - [`orchestrator`] - Per-verse and batch caching, eviction and cleanup
//! - [`job`] - Deferred caching of bookmarks through a background executor
//! - [`reclaimer`] - Removal of verses no remaining bookmark refers to
//! - [`engine`] - Wiring of all of the above from a `CoreConfig`
//!
//! ## Usage
//!
//! ```ignore
//! use core_cache::{CacheConfig, OfflineContentEngine};
//! use core_library::{resolver::resolve_for_caching, Bookmark};
//!
//! let engine = OfflineContentEngine::build(&core_config, CacheConfig::default()).await?;
//! let bookmark = engine.bookmarks().create(&Bookmark::range(1, 2, 1, 5)).await?;
//! let verses = resolve_for_caching(&bookmark)?;
//! let report = engine.orchestrator().cache_many(&verses, None, false).await;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod metadata;
pub mod orchestrator;
pub mod reclaimer;
pub mod stats;
pub mod traits;
pub mod urls;

#[cfg(test)]
mod test_support;

pub use config::{CacheConfig, ImageQuality, NO_RECITER};
pub use engine::OfflineContentEngine;
pub use error::{CacheError, Result};
pub use fetcher::{is_valid_asset, AssetFetcher, AssetKind, CacheRoot};
pub use job::{
    BookmarkCacheJob, BookmarkCachePayload, BookmarkCacheScheduler, ScheduleReport,
    CACHE_BOOKMARK_WORKER,
};
pub use metadata::HttpVerseMetadataProvider;
pub use orchestrator::CacheOrchestrator;
pub use reclaimer::{OrphanReclaimer, ReclaimReport};
pub use stats::{BatchReport, CacheUsage};
pub use traits::VerseMetadataProvider;
pub use urls::AssetUrls;
