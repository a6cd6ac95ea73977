//! Cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reciter identifier that disables recitation downloads.
pub const NO_RECITER: &str = "none";

/// Resolution of the rendered verse images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageQuality {
    Medium,
    High,
}

impl ImageQuality {
    pub fn as_path_segment(&self) -> &'static str {
        match self {
            ImageQuality::Medium => "medium",
            ImageQuality::High => "high",
        }
    }
}

/// Configuration for the offline content cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory for recitation files, relative to the cache root
    pub audio_directory: String,

    /// Directory for verse images, relative to the cache root
    pub image_directory: String,

    /// Reciter edition used when a caller does not name one (default: ar.alafasy)
    pub default_reciter: String,

    /// Audio bitrate path segment (default: "64")
    pub audio_bitrate: String,

    /// Image resolution (default: medium)
    pub image_quality: ImageQuality,

    /// Base URL of the verse image service
    pub image_base_url: String,

    /// Base URL of the recitation CDN
    pub audio_base_url: String,

    /// Base URL of the verse metadata API
    pub metadata_base_url: String,

    /// Timeout for a single asset transfer (default: 60s)
    pub download_timeout: Duration,

    /// Number of verses cached concurrently in a batch (default: 2)
    pub max_concurrent_downloads: usize,

    /// Age after which cached content is considered stale (default: 30 days)
    pub retention: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            audio_directory: "quran_audio".to_string(),
            image_directory: "quran_images".to_string(),
            default_reciter: "ar.alafasy".to_string(),
            audio_bitrate: "64".to_string(),
            image_quality: ImageQuality::Medium,
            image_base_url: "https://api.quran.com/api/v4/quran/images".to_string(),
            audio_base_url: "https://cdn.islamic.network/quran/audio".to_string(),
            metadata_base_url: "https://api.alquran.cloud".to_string(),
            download_timeout: Duration::from_secs(60),
            max_concurrent_downloads: 2,
            retention: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reciter used when none is given. `"none"` disables audio.
    pub fn with_default_reciter(mut self, reciter: impl Into<String>) -> Self {
        self.default_reciter = reciter.into();
        self
    }

    pub fn with_audio_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.audio_bitrate = bitrate.into();
        self
    }

    pub fn with_image_quality(mut self, quality: ImageQuality) -> Self {
        self.image_quality = quality;
        self
    }

    /// Point all remote endpoints at different hosts.
    pub fn with_base_urls(
        mut self,
        image: impl Into<String>,
        audio: impl Into<String>,
        metadata: impl Into<String>,
    ) -> Self {
        self.image_base_url = image.into();
        self.audio_base_url = audio.into();
        self.metadata_base_url = metadata.into();
        self
    }

    /// Set download timeout.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Set maximum concurrent downloads.
    pub fn with_max_concurrent_downloads(mut self, count: usize) -> Self {
        self.max_concurrent_downloads = count;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// The configured default reciter, or `None` when audio is disabled.
    pub fn effective_reciter(&self) -> Option<&str> {
        Some(self.default_reciter.as_str()).filter(|r| !r.is_empty() && *r != NO_RECITER)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_downloads == 0 {
            return Err("max_concurrent_downloads must be at least 1".to_string());
        }

        if self.audio_directory.is_empty() || self.image_directory.is_empty() {
            return Err("cache directories cannot be empty".to_string());
        }

        if self.audio_directory == self.image_directory {
            return Err("audio and image directories must differ".to_string());
        }

        if self.download_timeout.is_zero() {
            return Err("download_timeout must be greater than 0".to_string());
        }

        if self.audio_bitrate.is_empty() {
            return Err("audio_bitrate cannot be empty".to_string());
        }

        for (name, url) in [
            ("image_base_url", &self.image_base_url),
            ("audio_base_url", &self.audio_base_url),
            ("metadata_base_url", &self.metadata_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("{} must be an http(s) URL, got {:?}", name, url));
            }
        }

        Ok(())
    }
}
