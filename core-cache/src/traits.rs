//! Seams between the orchestrator and its remote dependencies.

use async_trait::async_trait;
use core_library::models::{VerseMetadata, VerseReference};

use crate::error::Result;

/// Source of per-verse descriptive data.
///
/// Implementations should return [`CacheError::NotFound`] when the service
/// does not know the verse and [`CacheError::NetworkFailure`] for anything
/// transport related.
///
/// [`CacheError::NotFound`]: crate::error::CacheError::NotFound
/// [`CacheError::NetworkFailure`]: crate::error::CacheError::NetworkFailure
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerseMetadataProvider: Send + Sync {
    async fn get_verse_metadata(&self, reference: &VerseReference) -> Result<VerseMetadata>;
}
