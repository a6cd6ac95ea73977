//! Batch and usage reporting

use core_library::models::{CacheEntry, VerseReference};
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Outcome of caching a batch of verses
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Distinct verses attempted
    pub requested: usize,
    /// Entries written, in request order
    pub cached: Vec<CacheEntry>,
    /// Verses whose metadata or index write failed
    pub failed: Vec<(VerseReference, CacheError)>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Fraction of the batch that was cached, `1.0` for an empty batch.
    pub fn success_ratio(&self) -> f64 {
        if self.requested == 0 {
            1.0
        } else {
            self.cached.len() as f64 / self.requested as f64
        }
    }

    /// The cached entries, or [`CacheError::PartialBatch`] if anything failed.
    pub fn ensure_complete(self) -> Result<Vec<CacheEntry>> {
        if self.is_complete() {
            Ok(self.cached)
        } else {
            Err(CacheError::PartialBatch {
                cached: self.cached.len(),
                requested: self.requested,
            })
        }
    }
}

/// Snapshot of what the cache currently holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheUsage {
    /// Bytes in the asset directories
    pub bytes_on_disk: u64,
    /// Index entries with both image and audio
    pub fully_cached: i64,
    /// All index entries
    pub entries: usize,
}

impl CacheUsage {
    pub fn size_mb(&self) -> f64 {
        self.bytes_on_disk as f64 / (1024.0 * 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_empty_batch_is_complete() {
        let report = BatchReport::default();
        assert!(report.is_complete());
        assert_eq!(report.success_ratio(), 1.0);
        assert!(report.ensure_complete().unwrap().is_empty());
    }

    #[test]
    fn test_partial_batch() {
        let reference = VerseReference::new(2, 1).unwrap();
        let report = BatchReport {
            requested: 2,
            cached: vec![CacheEntry::new(&reference, Utc::now())],
            failed: vec![(
                VerseReference::new(2, 2).unwrap(),
                CacheError::NetworkFailure("down".to_string()),
            )],
        };

        assert!(!report.is_complete());
        assert_eq!(report.success_ratio(), 0.5);
        assert!(matches!(
            report.ensure_complete(),
            Err(CacheError::PartialBatch {
                cached: 1,
                requested: 2
            })
        ));
    }

    #[test]
    fn test_usage_size_mb() {
        let usage = CacheUsage {
            bytes_on_disk: 3 * 1024 * 1024,
            fully_cached: 1,
            entries: 2,
        };
        assert_eq!(usage.size_mb(), 3.0);
    }
}
