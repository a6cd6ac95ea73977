//! # Bookmark Library
//!
//! Owns the bookmark database and the offline content index, and the pure
//! verse arithmetic both depend on.
//!
//! ## Overview
//!
//! This crate manages:
//! - The structural index of the 114 chapters ([`structure`])
//! - Verse references, bookmarks and cache entries ([`models`])
//! - Expansion of a bookmark into the verses it denotes ([`resolver`])
//! - SQLite schema, migrations and connection pooling ([`db`])
//! - Repositories for bookmarks and cached content ([`repositories`])

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod resolver;
pub mod structure;

pub use error::{LibraryError, Result};
pub use models::{Bookmark, BookmarkId, BookmarkKind, CacheEntry, VerseMetadata, VerseReference};
