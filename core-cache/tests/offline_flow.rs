//! End-to-end caching flow against an in-memory index and a temp cache root.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_cache::{
    is_valid_asset, AssetFetcher, AssetKind, CacheConfig, CacheError, CacheOrchestrator,
    CacheRoot, VerseMetadataProvider,
};
use core_library::db::create_test_pool;
use core_library::models::{Bookmark, VerseMetadata, VerseReference};
use core_library::repositories::SqliteCacheIndexRepository;
use core_library::resolver::{needs_opening_formula, resolve, resolve_for_caching};
use mockall::mock;
use tempfile::TempDir;

mock! {
    Metadata {}

    #[async_trait]
    impl VerseMetadataProvider for Metadata {
        async fn get_verse_metadata(
            &self,
            reference: &VerseReference,
        ) -> core_cache::Result<VerseMetadata>;
    }
}

/// Counts downloads and serves the URL back as the body.
#[derive(Default)]
struct CountingHttpClient {
    downloads: AtomicUsize,
}

#[async_trait]
impl HttpClient for CountingHttpClient {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        Err(BridgeError::NotAvailable("execute".to_string()))
    }

    async fn download_stream(
        &self,
        url: String,
    ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Cursor::new(url.into_bytes())))
    }
}

fn metadata_for(reference: &VerseReference) -> VerseMetadata {
    VerseMetadata {
        text: format!("text {}", reference),
        chapter_name: "name".to_string(),
        chapter_name_en: "Name".to_string(),
        chapter: reference.chapter(),
        revelation_type: "Medinan".to_string(),
        verse_count: 286,
        hizb_quarter: 1,
        ruku: 1,
        page: 2,
        manzil: 1,
        sajda: false,
        global_number: reference.global_number(),
        verse_in_chapter: reference.verse(),
    }
}

fn config() -> CacheConfig {
    CacheConfig::default()
        .with_base_urls("http://img.test", "http://audio.test", "http://meta.test")
        .with_download_timeout(Duration::from_secs(5))
}

async fn orchestrator(
    dir: &TempDir,
    http: Arc<CountingHttpClient>,
    metadata: MockMetadata,
) -> CacheOrchestrator {
    let config = config();
    let pool = create_test_pool().await.unwrap();
    let fetcher = AssetFetcher::new(
        CacheRoot::from_config(dir.path(), &config),
        http,
        config.download_timeout,
    );
    let orchestrator = CacheOrchestrator::new(
        config,
        Arc::new(SqliteCacheIndexRepository::new(pool)),
        Arc::new(metadata),
        Arc::new(fetcher),
    );
    orchestrator.initialize().await.unwrap();
    orchestrator
}

#[tokio::test]
async fn test_single_verse_range_caches_with_opening_formula() {
    let dir = TempDir::new().unwrap();
    let http = Arc::new(CountingHttpClient::default());
    let mut metadata = MockMetadata::new();
    metadata
        .expect_get_verse_metadata()
        .times(2)
        .returning(|reference| Ok(metadata_for(reference)));
    let orchestrator = orchestrator(&dir, http.clone(), metadata).await;

    let bookmark = Bookmark::range(1, 2, 1, 1);
    let resolved = resolve(&bookmark).unwrap();
    assert_eq!(resolved, vec![VerseReference::new(2, 1).unwrap()]);
    assert_eq!(resolved[0].global_number(), 8);
    assert!(needs_opening_formula(&resolved));

    let verses = resolve_for_caching(&bookmark).unwrap();
    assert_eq!(
        verses,
        vec![VerseReference::new(2, 1).unwrap(), VerseReference::OPENING_FORMULA]
    );

    let report = orchestrator.cache_many(&verses, Some("ar.alafasy"), false).await;
    assert_eq!(report.requested, 2);
    assert_eq!(report.cached.len(), 2);
    let cached = report.ensure_complete().unwrap();
    assert_eq!(http.downloads.load(Ordering::SeqCst), 4);

    for entry in &cached {
        assert!(entry.is_fully_cached());
        assert!(is_valid_asset(entry.image_path.as_ref().unwrap()).await);
        assert!(is_valid_asset(entry.audio_path.as_ref().unwrap()).await);
    }

    let audio = tokio::fs::read_to_string(
        cached[0].audio_path.as_ref().unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(audio, "http://audio.test/64/ar.alafasy/8.mp3");
}

#[tokio::test]
async fn test_second_batch_is_served_from_index() {
    let dir = TempDir::new().unwrap();
    let http = Arc::new(CountingHttpClient::default());
    let mut metadata = MockMetadata::new();
    metadata
        .expect_get_verse_metadata()
        .times(1)
        .returning(|reference| Ok(metadata_for(reference)));
    let orchestrator = orchestrator(&dir, http.clone(), metadata).await;

    let verse = [VerseReference::new(2, 255).unwrap()];
    orchestrator.cache_many(&verse, None, false).await;
    let downloads = http.downloads.load(Ordering::SeqCst);

    let report = orchestrator.cache_many(&verse, None, false).await;

    assert_eq!(report.cached.len(), 1);
    assert_eq!(http.downloads.load(Ordering::SeqCst), downloads);
}

#[tokio::test]
async fn test_metadata_not_found_fails_batch() {
    let dir = TempDir::new().unwrap();
    let http = Arc::new(CountingHttpClient::default());
    let mut metadata = MockMetadata::new();
    metadata.expect_get_verse_metadata().returning(|reference| {
        Err(CacheError::NotFound {
            entity_type: "Verse".to_string(),
            id: reference.cache_id(),
        })
    });
    let orchestrator = orchestrator(&dir, http.clone(), metadata).await;

    let report = orchestrator
        .cache_many(&[VerseReference::new(36, 1).unwrap()], None, false)
        .await;

    assert!(report.cached.is_empty());
    assert!(matches!(
        report.ensure_complete(),
        Err(CacheError::PartialBatch {
            cached: 0,
            requested: 1
        })
    ));
    assert_eq!(http.downloads.load(Ordering::SeqCst), 0);
    assert!(orchestrator.entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_image_then_audio_merges_into_full_entry() {
    let dir = TempDir::new().unwrap();
    let http = Arc::new(CountingHttpClient::default());
    let mut metadata = MockMetadata::new();
    metadata
        .expect_get_verse_metadata()
        .times(2)
        .returning(|reference| Ok(metadata_for(reference)));
    let orchestrator = orchestrator(&dir, http, metadata).await;
    let verse = VerseReference::new(112, 1).unwrap();

    let image_only = orchestrator.cache_one(&verse, None, false).await.unwrap();
    assert!(image_only.image_path.is_some());
    assert!(image_only.audio_path.is_none());

    let full = orchestrator
        .cache_one(&verse, Some("ar.alafasy"), true)
        .await
        .unwrap();
    assert!(full.is_fully_cached());
    assert!(orchestrator.is_fully_cached(&verse).await.unwrap());

    let usage = orchestrator.usage().await.unwrap();
    assert_eq!(usage.fully_cached, 1);
    assert_eq!(usage.entries, 1);
    assert!(usage.bytes_on_disk > 0);
}

#[tokio::test]
async fn test_cache_root_layout() {
    let dir = TempDir::new().unwrap();
    let root = CacheRoot::from_config(dir.path(), &config());
    let verse = VerseReference::new(2, 255).unwrap();

    assert_eq!(
        root.asset_path(AssetKind::Image, &verse),
        dir.path().join("quran_images").join("image_2_255.png")
    );
    assert_eq!(
        root.asset_path(AssetKind::Audio, &verse),
        dir.path().join("quran_audio").join("audio_2_255.mp3")
    );
}
