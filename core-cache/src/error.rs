//! # Cache Error Types
//!
//! Error taxonomy for resolving, downloading and indexing offline verse content.

use core_library::error::LibraryError;
use thiserror::Error;

/// Errors that can occur during offline caching operations.
#[derive(Error, Debug)]
pub enum CacheError {
    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// A bookmark, cache entry or remote verse does not exist.
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// A chapter, verse or page number outside the structural index.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Malformed input that is not a range problem.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // Transfer Errors
    // ========================================================================
    /// The remote could not be reached or answered with an error.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Writing, syncing or renaming a local file failed.
    #[error("I/O failure: {0}")]
    IoFailure(String),

    // ========================================================================
    // Batch Errors
    // ========================================================================
    /// Only some verses of a batch could be cached.
    #[error("Partial batch: cached {cached} of {requested} verses")]
    PartialBatch { cached: usize, requested: usize },

    // ========================================================================
    // Infrastructure Errors
    // ========================================================================
    /// Cache configuration failed validation.
    #[error("Invalid cache configuration: {0}")]
    Config(String),

    /// The background executor rejected a request.
    #[error("Scheduling failed: {0}")]
    Scheduling(String),

    /// Database or model error from core-library.
    #[error("Library error: {0}")]
    Library(LibraryError),
}

impl From<LibraryError> for CacheError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::NotFound { entity_type, id } => CacheError::NotFound { entity_type, id },
            LibraryError::OutOfRange { .. } => CacheError::OutOfRange(err.to_string()),
            LibraryError::InvalidInput { .. } => CacheError::InvalidInput(err.to_string()),
            other => CacheError::Library(other),
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::IoFailure(err.to_string())
    }
}

impl CacheError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CacheError::NetworkFailure(_) | CacheError::IoFailure(_) | CacheError::PartialBatch { .. }
        )
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(self, CacheError::NetworkFailure(_))
    }
}

/// Result type for caching operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_errors_map_onto_taxonomy() {
        let not_found: CacheError = LibraryError::NotFound {
            entity_type: "Bookmark".to_string(),
            id: "7".to_string(),
        }
        .into();
        assert!(matches!(not_found, CacheError::NotFound { ref id, .. } if id == "7"));

        let out_of_range: CacheError = LibraryError::OutOfRange {
            field: "chapter".to_string(),
            value: 115,
            min: 1,
            max: 114,
        }
        .into();
        assert!(matches!(out_of_range, CacheError::OutOfRange(_)));

        let migration: CacheError = LibraryError::Migration("boom".to_string()).into();
        assert!(matches!(migration, CacheError::Library(_)));
    }

    #[test]
    fn test_io_error_is_io_failure() {
        let err: CacheError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(matches!(err, CacheError::IoFailure(_)));
        assert!(err.is_transient());
        assert!(!err.is_network_error());
    }

    #[test]
    fn test_error_classification() {
        assert!(CacheError::NetworkFailure("timeout".into()).is_network_error());
        assert!(CacheError::NetworkFailure("timeout".into()).is_transient());
        assert!(!CacheError::OutOfRange("chapter".into()).is_transient());
        assert!(!CacheError::Config("bad".into()).is_transient());
    }
}
