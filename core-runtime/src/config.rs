//! # Core Configuration Module
//!
//! Provides configuration management for the offline content engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host capabilities and settings the engine needs.
//! It enforces fail-fast validation so that a missing capability is reported
//! when the engine is assembled rather than on the first download.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Metadata requests and asset downloads
//!
//! ## Optional Dependencies
//!
//! - `NetworkMonitor` - Connectivity detection
//! - `BackgroundExecutor` - Deferred bookmark caching
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for
//! `HttpClient` and `BackgroundExecutor` are injected automatically if not
//! provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/quran.db")
//!     .cache_dir("/path/to/cache")
//!     .http_client(Arc::new(MyHttpClient))
//!     .default_reciter("ar.husary")
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing cache directory
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/quran.db")
//!     .build()
//!     .expect("Should fail - missing cache directory");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{BackgroundExecutor, HttpClient, NetworkMonitor};
use std::path::PathBuf;
use std::sync::Arc;

/// Reciter used for audio when the host does not choose one.
pub const DEFAULT_RECITER: &str = "ar.alafasy";

/// Core configuration for the offline content engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file holding bookmarks and the cache index
    pub database_path: PathBuf,

    /// Root directory for cached verse images and recitation audio
    pub cache_dir: PathBuf,

    /// HTTP client for metadata and downloads (required, desktop default available)
    pub http_client: Arc<dyn HttpClient>,

    /// Network connectivity monitor (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Background task executor (optional, desktop default available)
    pub background_executor: Option<Arc<dyn BackgroundExecutor>>,

    /// Reciter edition used when a caller does not name one
    pub default_reciter: String,

    /// Features flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("cache_dir", &self.cache_dir)
            .field("http_client", &"HttpClient { ... }")
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field(
                "background_executor",
                &self
                    .background_executor
                    .as_ref()
                    .map(|_| "BackgroundExecutor { ... }"),
            )
            .field("default_reciter", &self.default_reciter)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
///
/// Features may require corresponding bridge implementations to function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Cache bookmarks through deferred jobs (requires BackgroundExecutor)
    pub enable_background_caching: bool,

    /// Gate background jobs on connectivity (requires NetworkMonitor)
    pub enable_network_awareness: bool,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path and cache directory are not empty
    /// - The default reciter is a usable edition identifier
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::invalid("database path", "cannot be empty"));
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::invalid("cache directory", "cannot be empty"));
        }

        let reciter = self.default_reciter.trim();
        if reciter.is_empty() {
            return Err(Error::invalid("default reciter", "cannot be empty"));
        }
        if reciter.contains('/') || reciter.chars().any(char::is_whitespace) {
            return Err(Error::invalid(
                "default reciter",
                format!(
                    "'{}' must be a single edition identifier",
                    self.default_reciter
                ),
            ));
        }

        if self.features.enable_background_caching && self.background_executor.is_none() {
            return Err(Error::BridgeRequired {
                feature: "Background caching",
                bridge: "BackgroundExecutor",
            });
        }

        if self.features.enable_network_awareness && self.network_monitor.is_none() {
            return Err(Error::BridgeRequired {
                feature: "Network awareness",
                bridge: "NetworkMonitor",
            });
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for metadata and asset downloads. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Mobile: inject a platform-native HTTP adapter."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_network_monitor() -> Option<Arc<dyn NetworkMonitor>> {
    use bridge_desktop::DesktopNetworkMonitor;

    let monitor: Arc<dyn NetworkMonitor> = Arc::new(DesktopNetworkMonitor::new());
    Some(monitor)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_network_monitor() -> Option<Arc<dyn NetworkMonitor>> {
    None
}

#[cfg(feature = "desktop-shims")]
fn provide_default_background_executor(
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
) -> Option<Arc<dyn BackgroundExecutor>> {
    use bridge_desktop::TokioBackgroundExecutor;

    let mut executor = TokioBackgroundExecutor::new();
    if let Some(monitor) = network_monitor {
        executor = executor.with_network_monitor(monitor);
    }
    let executor: Arc<dyn BackgroundExecutor> = Arc::new(executor);
    Some(executor)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_background_executor(
    _network_monitor: Option<Arc<dyn NetworkMonitor>>,
) -> Option<Arc<dyn BackgroundExecutor>> {
    None
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    background_executor: Option<Arc<dyn BackgroundExecutor>>,
    default_reciter: Option<String>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the database file path (required).
    ///
    /// The parent directory must exist; the file is created on first use.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the cache root directory (required).
    ///
    /// Image and audio subdirectories are created beneath it.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the HTTP client.
    ///
    /// If omitted, the desktop default is used when the `desktop-shims`
    /// feature is enabled; otherwise `build()` fails.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use core_runtime::config::CoreConfig;
    /// use std::sync::Arc;
    ///
    /// let builder = CoreConfig::builder().http_client(Arc::new(MyHttpClient));
    /// ```
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the network monitor.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the background executor used for deferred bookmark caching.
    pub fn background_executor(mut self, executor: Arc<dyn BackgroundExecutor>) -> Self {
        self.background_executor = Some(executor);
        self
    }

    /// Sets the reciter edition used when callers do not name one.
    ///
    /// Default: `ar.alafasy`
    pub fn default_reciter(mut self, reciter: impl Into<String>) -> Self {
        self.default_reciter = Some(reciter.into());
        self
    }

    /// Enables or disables deferred bookmark caching.
    ///
    /// Requires a `BackgroundExecutor`. With `desktop-shims`, the Tokio
    /// executor is provided automatically when this is enabled.
    ///
    /// Default: false
    pub fn enable_background_caching(mut self, enabled: bool) -> Self {
        self.features.enable_background_caching = enabled;
        self
    }

    /// Enables or disables network awareness.
    ///
    /// Requires a `NetworkMonitor`. With `desktop-shims`, the probe-based
    /// desktop monitor is provided automatically when this is enabled.
    ///
    /// Default: false
    pub fn enable_network_awareness(mut self, enabled: bool) -> Self {
        self.features.enable_network_awareness = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error with an actionable message if a required field or
    /// capability is missing, or if the feature flags are inconsistent with
    /// the provided bridges.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or(Error::MissingSetting {
            setting: "Database path",
            builder_method: "database_path",
        })?;

        let cache_dir = self.cache_dir.ok_or(Error::MissingSetting {
            setting: "Cache directory",
            builder_method: "cache_dir",
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let network_monitor = match self.network_monitor {
            Some(monitor) => Some(monitor),
            None if self.features.enable_network_awareness => provide_default_network_monitor(),
            None => None,
        };

        let background_executor = match self.background_executor {
            Some(executor) => Some(executor),
            None if self.features.enable_background_caching => {
                provide_default_background_executor(network_monitor.clone())
            }
            None => None,
        };

        let config = CoreConfig {
            database_path,
            cache_dir,
            http_client,
            network_monitor,
            background_executor,
            default_reciter: self
                .default_reciter
                .unwrap_or_else(|| DEFAULT_RECITER.to_string()),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
