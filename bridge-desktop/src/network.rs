//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);

/// Desktop network monitor implementation
///
/// Connectivity is inferred from a TCP probe to a well-known host. Results
/// are cached briefly so constraint polling does not open a socket per check.
///
/// Desktop connections are reported as unmetered and of unknown type, so a
/// WiFi-only constraint is never satisfied by this monitor.
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    cache_ttl: Duration,
    cached: Mutex<Option<(Instant, NetworkInfo)>>,
}

impl DesktopNetworkMonitor {
    pub fn new() -> Self {
        Self::with_probe_addr(DEFAULT_PROBE_ADDR)
    }

    /// Probe `addr` (host:port) instead of the default public resolver.
    pub fn with_probe_addr(addr: impl Into<String>) -> Self {
        Self {
            probe_addr: addr.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cached: Mutex::new(None),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            PROBE_TIMEOUT,
            tokio::net::TcpStream::connect(self.probe_addr.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let mut cached = self.cached.lock().await;
        if let Some((checked_at, info)) = cached.as_ref() {
            if checked_at.elapsed() < self.cache_ttl {
                return Ok(info.clone());
            }
        }

        let status = self.check_connectivity().await;
        let info = NetworkInfo {
            status,
            network_type: (status == NetworkStatus::Connected).then_some(NetworkType::Other),
            is_metered: false,
            is_expensive: false,
        };

        *cached = Some((Instant::now(), info.clone()));
        debug!(status = ?status, probe = %self.probe_addr, "Network info updated");

        Ok(info)
    }

    async fn is_wifi(&self) -> bool {
        false
    }

    async fn is_metered(&self) -> bool {
        false
    }
}
