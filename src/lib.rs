//! Workspace facade crate.
//!
//! Re-exports the offline content engine and its configuration so host
//! applications can depend on a single crate. The default `desktop-shims`
//! feature fills missing bridges with the desktop implementations.

pub use core_cache::{
    BatchReport, CacheConfig, CacheError, CacheOrchestrator, CacheUsage, OfflineContentEngine,
    OrphanReclaimer, ReclaimReport,
};
pub use core_library::models::{Bookmark, CacheEntry, VerseMetadata, VerseReference};
pub use core_library::resolver::{needs_opening_formula, resolve, resolve_for_caching};
pub use core_runtime::{CoreConfig, CoreConfigBuilder, FeatureFlags};
