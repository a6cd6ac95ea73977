//! # Asset Fetcher
//!
//! Downloads verse images and recitations into the cache directories.
//!
//! ## Atomic writes
//!
//! Every transfer streams into a uniquely named `*.tmp` sibling of the final
//! file, is flushed and synced, and only then renamed into place. A reader
//! therefore never observes a partially written asset, and two concurrent
//! fetches of the same asset never share a temp file. Any failure removes the
//! temp file before the error is returned.
//!
//! A file that already exists with a non-zero size is treated as valid and is
//! returned without touching the network.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::http::HttpClient;
use core_library::models::VerseReference;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

const CHUNK_SIZE: usize = 64 * 1024;
const TEMP_SUFFIX: &str = "tmp";

/// Kind of downloadable asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Audio,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Audio => "audio",
        }
    }

    /// Canonical file name for `reference`, e.g. `audio_2_255.mp3`.
    pub fn file_name(&self, reference: &VerseReference) -> String {
        let extension = match self {
            AssetKind::Image => "png",
            AssetKind::Audio => "mp3",
        };
        format!(
            "{}_{}_{}.{}",
            self.as_str(),
            reference.chapter(),
            reference.verse(),
            extension
        )
    }
}

/// Layout of the on-disk cache
#[derive(Debug, Clone)]
pub struct CacheRoot {
    base: PathBuf,
    image_dir: PathBuf,
    audio_dir: PathBuf,
}

impl CacheRoot {
    /// Root with the default directory names.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self::from_config(base, &CacheConfig::default())
    }

    pub fn from_config(base: impl Into<PathBuf>, config: &CacheConfig) -> Self {
        let base = base.into();
        Self {
            image_dir: base.join(&config.image_directory),
            audio_dir: base.join(&config.audio_directory),
            base,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn directory(&self, kind: AssetKind) -> &Path {
        match kind {
            AssetKind::Image => &self.image_dir,
            AssetKind::Audio => &self.audio_dir,
        }
    }

    pub fn asset_path(&self, kind: AssetKind, reference: &VerseReference) -> PathBuf {
        self.directory(kind).join(kind.file_name(reference))
    }

    /// Create both asset directories.
    pub async fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.image_dir, &self.audio_dir] {
            fs::create_dir_all(dir).await.map_err(|e| {
                CacheError::IoFailure(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.image_dir) || path.starts_with(&self.audio_dir)
    }
}

/// True iff `path` is an existing regular file with a non-zero size.
pub async fn is_valid_asset(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(metadata) => metadata.is_file() && metadata.len() > 0,
        Err(_) => false,
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.{}", Uuid::new_v4().simple(), TEMP_SUFFIX));
    target.with_file_name(name)
}

fn is_temp_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(TEMP_SUFFIX)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove temp file {}: {}", path.display(), e);
        }
    }
}

/// Regular files directly under `dir`; a missing directory is empty.
async fn list_files(dir: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if metadata.is_file() {
            files.push((entry.path(), metadata.len()));
        }
    }
    Ok(files)
}

/// Streams remote assets into the cache root.
pub struct AssetFetcher {
    root: CacheRoot,
    http_client: Arc<dyn HttpClient>,
    download_timeout: Duration,
}

impl AssetFetcher {
    pub fn new(root: CacheRoot, http_client: Arc<dyn HttpClient>, download_timeout: Duration) -> Self {
        Self {
            root,
            http_client,
            download_timeout,
        }
    }

    pub fn root(&self) -> &CacheRoot {
        &self.root
    }

    /// Ensure the `kind` asset of `reference` is on disk, downloading it from
    /// `url` when it is not, and return its final path.
    #[instrument(skip(self), fields(kind = kind.as_str(), verse = %reference))]
    pub async fn fetch(
        &self,
        kind: AssetKind,
        url: &str,
        reference: &VerseReference,
    ) -> Result<PathBuf> {
        let target = self.root.asset_path(kind, reference);
        if is_valid_asset(&target).await {
            debug!("Asset already present at {}", target.display());
            return Ok(target);
        }

        let dir = self.root.directory(kind);
        fs::create_dir_all(dir).await.map_err(|e| {
            CacheError::IoFailure(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let temp = temp_path_for(&target);
        let transfer = match timeout(self.download_timeout, self.download_to(url, &temp)).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::NetworkFailure(format!(
                "Download of {} timed out after {:?}",
                url, self.download_timeout
            ))),
        };

        let bytes = match transfer {
            Ok(bytes) => bytes,
            Err(e) => {
                discard(&temp).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&temp, &target).await {
            discard(&temp).await;
            return Err(CacheError::IoFailure(format!(
                "Failed to move {} into place: {}",
                target.display(),
                e
            )));
        }

        info!("Cached {} bytes at {}", bytes, target.display());
        Ok(target)
    }

    async fn download_to(&self, url: &str, temp: &Path) -> Result<u64> {
        let mut reader = self
            .http_client
            .download_stream(url.to_string())
            .await
            .map_err(|e| CacheError::NetworkFailure(format!("Failed to fetch {}: {}", url, e)))?;

        let mut file = fs::File::create(temp).await.map_err(|e| {
            CacheError::IoFailure(format!("Failed to create {}: {}", temp.display(), e))
        })?;

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut written = 0u64;
        loop {
            let read = reader.read(&mut buffer).await.map_err(|e| {
                CacheError::NetworkFailure(format!("Transfer from {} interrupted: {}", url, e))
            })?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read]).await.map_err(|e| {
                CacheError::IoFailure(format!("Failed to write {}: {}", temp.display(), e))
            })?;
            written += read as u64;
        }

        if written == 0 {
            return Err(CacheError::NetworkFailure(format!(
                "Empty response body from {}",
                url
            )));
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Final path of the asset if it is present and valid.
    pub async fn cached_path(&self, kind: AssetKind, reference: &VerseReference) -> Option<PathBuf> {
        let path = self.root.asset_path(kind, reference);
        is_valid_asset(&path).await.then_some(path)
    }

    pub async fn is_cached(&self, kind: AssetKind, reference: &VerseReference) -> bool {
        self.cached_path(kind, reference).await.is_some()
    }

    /// Remove the canonical file of an asset. Returns whether a file existed.
    pub async fn delete(&self, kind: AssetKind, reference: &VerseReference) -> Result<bool> {
        let path = self.root.asset_path(kind, reference);
        self.delete_path(&path).await
    }

    /// Remove a file recorded in the index.
    ///
    /// Paths outside the asset directories are left alone.
    pub async fn delete_path(&self, path: &Path) -> Result<bool> {
        if !self.root.contains(path) {
            warn!("Refusing to delete {} outside the cache root", path.display());
            return Ok(false);
        }
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::IoFailure(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Total size in bytes of everything in the asset directories.
    pub async fn cache_size(&self) -> Result<u64> {
        let mut total = 0;
        for kind in [AssetKind::Image, AssetKind::Audio] {
            total += list_files(self.root.directory(kind))
                .await?
                .iter()
                .map(|(_, len)| len)
                .sum::<u64>();
        }
        Ok(total)
    }

    /// Delete every file in the asset directories. Returns the number removed.
    pub async fn clear_all(&self) -> Result<u64> {
        let mut removed = 0;
        for kind in [AssetKind::Image, AssetKind::Audio] {
            for (path, _) in list_files(self.root.directory(kind)).await? {
                fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        info!("Cleared {} cached files", removed);
        Ok(removed)
    }

    /// Remove temp files left behind by an interrupted process.
    pub async fn purge_temp_files(&self) -> Result<usize> {
        let mut purged = 0;
        for kind in [AssetKind::Image, AssetKind::Audio] {
            for (path, _) in list_files(self.root.directory(kind)).await? {
                if is_temp_file(&path) {
                    discard(&path).await;
                    purged += 1;
                }
            }
        }
        if purged > 0 {
            info!("Purged {} stale temp files", purged);
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpRequest, HttpResponse, RetryPolicy};
    use mockall::mock;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;
    use tokio::io::{AsyncRead, ReadBuf};

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn execute_with_retry(
                &self,
                request: HttpRequest,
                policy: RetryPolicy,
            ) -> BridgeResult<HttpResponse>;
            async fn download_stream(
                &self,
                url: String,
            ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
        }
    }

    /// Yields a few bytes, then fails.
    struct BrokenReader {
        sent: bool,
    }

    impl AsyncRead for BrokenReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.sent {
                Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                )))
            } else {
                self.sent = true;
                buf.put_slice(b"partial");
                Poll::Ready(Ok(()))
            }
        }
    }

    fn body(bytes: &[u8]) -> BridgeResult<Box<dyn AsyncRead + Send + Unpin>> {
        Ok(Box::new(Cursor::new(bytes.to_vec())))
    }

    fn reference() -> VerseReference {
        VerseReference::new(2, 255).unwrap()
    }

    fn fetcher(dir: &TempDir, client: MockHttpClient) -> AssetFetcher {
        AssetFetcher::new(
            CacheRoot::new(dir.path()),
            Arc::new(client),
            Duration::from_secs(5),
        )
    }

    async fn temp_files(dir: &Path) -> usize {
        list_files(dir)
            .await
            .unwrap()
            .iter()
            .filter(|(p, _)| is_temp_file(p))
            .count()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(AssetKind::Image.file_name(&reference()), "image_2_255.png");
        assert_eq!(AssetKind::Audio.file_name(&reference()), "audio_2_255.mp3");
    }

    #[test]
    fn test_temp_path_is_unique_sibling() {
        let target = PathBuf::from("/cache/quran_audio/audio_1_1.mp3");
        let first = temp_path_for(&target);
        let second = temp_path_for(&target);
        assert_ne!(first, second);
        assert_eq!(first.parent(), target.parent());
        assert!(is_temp_file(&first));
        assert!(!is_temp_file(&target));
    }

    #[tokio::test]
    async fn test_fetch_writes_final_file() {
        let dir = TempDir::new().unwrap();
        let mut client = MockHttpClient::new();
        client
            .expect_download_stream()
            .withf(|url| url == "http://audio.test/262.mp3")
            .times(1)
            .returning(|_| body(b"ID3 audio"));
        let fetcher = fetcher(&dir, client);

        let path = fetcher
            .fetch(AssetKind::Audio, "http://audio.test/262.mp3", &reference())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("quran_audio/audio_2_255.mp3"));
        assert_eq!(fs::read(&path).await.unwrap(), b"ID3 audio");
        assert_eq!(temp_files(fetcher.root().directory(AssetKind::Audio)).await, 0);
        assert!(fetcher.is_cached(AssetKind::Audio, &reference()).await);
    }

    #[tokio::test]
    async fn test_fetch_skips_existing_asset() {
        let dir = TempDir::new().unwrap();
        let mut client = MockHttpClient::new();
        client.expect_download_stream().times(0);
        let fetcher = fetcher(&dir, client);

        let target = fetcher.root().asset_path(AssetKind::Image, &reference());
        fs::create_dir_all(target.parent().unwrap()).await.unwrap();
        fs::write(&target, b"png").await.unwrap();

        let path = fetcher
            .fetch(AssetKind::Image, "http://img.test/2/255", &reference())
            .await
            .unwrap();
        assert_eq!(path, target);
    }

    #[tokio::test]
    async fn test_fetch_replaces_empty_file() {
        let dir = TempDir::new().unwrap();
        let mut client = MockHttpClient::new();
        client
            .expect_download_stream()
            .times(1)
            .returning(|_| body(b"png"));
        let fetcher = fetcher(&dir, client);

        let target = fetcher.root().asset_path(AssetKind::Image, &reference());
        fs::create_dir_all(target.parent().unwrap()).await.unwrap();
        fs::write(&target, b"").await.unwrap();

        fetcher
            .fetch(AssetKind::Image, "http://img.test/2/255", &reference())
            .await
            .unwrap();
        assert_eq!(fs::read(&target).await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_http_error_is_network_failure() {
        let dir = TempDir::new().unwrap();
        let mut client = MockHttpClient::new();
        client.expect_download_stream().returning(|_| {
            Err(BridgeError::Http {
                status: 404,
                message: "missing".to_string(),
            })
        });
        let fetcher = fetcher(&dir, client);

        let result = fetcher
            .fetch(AssetKind::Audio, "http://audio.test/262.mp3", &reference())
            .await;
        assert!(matches!(result, Err(CacheError::NetworkFailure(_))));
        assert!(!fetcher.is_cached(AssetKind::Audio, &reference()).await);
    }

    #[tokio::test]
    async fn test_interrupted_transfer_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let mut client = MockHttpClient::new();
        client
            .expect_download_stream()
            .returning(|_| Ok(Box::new(BrokenReader { sent: false }) as Box<dyn AsyncRead + Send + Unpin>));
        let fetcher = fetcher(&dir, client);

        let result = fetcher
            .fetch(AssetKind::Audio, "http://audio.test/262.mp3", &reference())
            .await;

        assert!(matches!(result, Err(CacheError::NetworkFailure(_))));
        let audio_dir = fetcher.root().directory(AssetKind::Audio);
        assert!(list_files(audio_dir).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut client = MockHttpClient::new();
        client
            .expect_download_stream()
            .returning(|_| body(b""));
        let fetcher = fetcher(&dir, client);

        let result = fetcher
            .fetch(AssetKind::Image, "http://img.test/2/255", &reference())
            .await;
        assert!(matches!(result, Err(CacheError::NetworkFailure(_))));
        assert_eq!(temp_files(fetcher.root().directory(AssetKind::Image)).await, 0);
    }

    #[tokio::test]
    async fn test_maintenance_operations() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, MockHttpClient::new());
        fetcher.root().ensure_directories().await.unwrap();

        let image = fetcher.root().asset_path(AssetKind::Image, &reference());
        let audio = fetcher.root().asset_path(AssetKind::Audio, &reference());
        fs::write(&image, b"12345").await.unwrap();
        fs::write(&audio, b"123").await.unwrap();
        fs::write(temp_path_for(&audio), b"junk").await.unwrap();

        assert_eq!(fetcher.cache_size().await.unwrap(), 12);
        assert_eq!(fetcher.purge_temp_files().await.unwrap(), 1);
        assert_eq!(fetcher.cache_size().await.unwrap(), 8);

        assert!(fetcher.delete(AssetKind::Image, &reference()).await.unwrap());
        assert!(!fetcher.delete(AssetKind::Image, &reference()).await.unwrap());

        assert!(!fetcher
            .delete_path(Path::new("/etc/hostname"))
            .await
            .unwrap());

        assert_eq!(fetcher.clear_all().await.unwrap(), 1);
        assert_eq!(fetcher.cache_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_directories_count_as_empty() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, MockHttpClient::new());
        assert_eq!(fetcher.cache_size().await.unwrap(), 0);
        assert_eq!(fetcher.clear_all().await.unwrap(), 0);
        assert_eq!(fetcher.purge_temp_files().await.unwrap(), 0);
    }
}
