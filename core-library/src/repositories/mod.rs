//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - Rows are mapped through private `*Row` structs so that domain models keep
//!   their narrow integer types and parsed paths
//!
//! ## Available Repositories
//!
//! - `BookmarkRepository` - User bookmarks with validation on write
//! - `CacheIndexRepository` - Per-verse offline content index with merge writes

pub mod bookmark;
pub mod cache;

pub use bookmark::{BookmarkRepository, SqliteBookmarkRepository};
pub use cache::{CacheIndexRepository, SqliteCacheIndexRepository};

use crate::error::{LibraryError, Result};

/// Narrow a stored integer column to `u16`.
pub(crate) fn column_u16(field: &str, value: i64) -> Result<u16> {
    u16::try_from(value).map_err(|_| LibraryError::out_of_range(field, value, 0, u16::MAX as i64))
}
