//! Fakes shared by the unit tests of this crate.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_library::db::create_test_pool;
use core_library::models::{VerseMetadata, VerseReference};
use core_library::repositories::SqliteCacheIndexRepository;
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::fetcher::{AssetFetcher, CacheRoot};
use crate::orchestrator::CacheOrchestrator;
use crate::traits::VerseMetadataProvider;

/// Serves `bytes:{url}` for every download and records what was asked for.
#[derive(Default)]
pub(crate) struct FakeHttpClient {
    requested: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
}

impl FakeHttpClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer 503 for every URL containing `pattern` from now on.
    pub(crate) fn fail_urls_containing(&self, pattern: &str) {
        self.failing.lock().unwrap().push(pattern.to_string());
    }

    pub(crate) fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        Err(BridgeError::NotAvailable("execute".to_string()))
    }

    async fn download_stream(
        &self,
        url: String,
    ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        self.requested.lock().unwrap().push(url.clone());
        let failing = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|pattern| url.contains(pattern.as_str()));
        if failing {
            return Err(BridgeError::Http {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(Box::new(Cursor::new(format!("bytes:{}", url).into_bytes())))
    }
}

/// Metadata derived from the structural index, with per-verse failures.
#[derive(Default)]
pub(crate) struct FakeMetadataProvider {
    calls: AtomicUsize,
    failing: Mutex<HashSet<VerseReference>>,
}

impl FakeMetadataProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_for(&self, reference: VerseReference) {
        self.failing.lock().unwrap().insert(reference);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub(crate) fn sample_metadata(reference: &VerseReference) -> VerseMetadata {
    VerseMetadata {
        text: format!("verse {}", reference),
        chapter_name: format!("chapter {}", reference.chapter()),
        chapter_name_en: format!("Chapter {}", reference.chapter()),
        chapter: reference.chapter(),
        revelation_type: "Meccan".to_string(),
        verse_count: core_library::structure::chapter_length(reference.chapter()).unwrap(),
        hizb_quarter: 1,
        ruku: 1,
        page: 1,
        manzil: 1,
        sajda: false,
        global_number: reference.global_number(),
        verse_in_chapter: reference.verse(),
    }
}

#[async_trait]
impl VerseMetadataProvider for FakeMetadataProvider {
    async fn get_verse_metadata(&self, reference: &VerseReference) -> Result<VerseMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(reference) {
            return Err(CacheError::NetworkFailure(format!(
                "metadata unavailable for {}",
                reference
            )));
        }
        Ok(sample_metadata(reference))
    }
}

pub(crate) fn test_config() -> CacheConfig {
    CacheConfig::default()
        .with_base_urls("http://img.test", "http://audio.test", "http://meta.test")
        .with_download_timeout(Duration::from_secs(5))
}

pub(crate) async fn test_pool() -> SqlitePool {
    create_test_pool().await.unwrap()
}

/// Initialized orchestrator over a fresh in-memory index rooted at `dir`.
pub(crate) async fn orchestrator(
    dir: &TempDir,
    http: Arc<dyn HttpClient>,
    metadata: Arc<dyn VerseMetadataProvider>,
) -> CacheOrchestrator {
    orchestrator_with_pool(dir, test_pool().await, http, metadata).await
}

pub(crate) async fn orchestrator_with_pool(
    dir: &TempDir,
    pool: SqlitePool,
    http: Arc<dyn HttpClient>,
    metadata: Arc<dyn VerseMetadataProvider>,
) -> CacheOrchestrator {
    let config = test_config();
    let fetcher = AssetFetcher::new(
        CacheRoot::from_config(dir.path(), &config),
        http,
        config.download_timeout,
    );
    let orchestrator = CacheOrchestrator::new(
        config,
        Arc::new(SqliteCacheIndexRepository::new(pool)),
        metadata,
        Arc::new(fetcher),
    );
    orchestrator.initialize().await.unwrap();
    orchestrator
}
