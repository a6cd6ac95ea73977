//! # Host Bridge Traits
//!
//! Capabilities the offline content engine needs from its host but does not
//! implement itself.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Metadata requests and streamed asset downloads
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity checks used to gate background work
//!
//! ### Scheduling
//! - [`BackgroundExecutor`](background::BackgroundExecutor) - Unique, constraint-aware one-shot work
//! - [`WorkHandler`](background::WorkHandler) - Executes the payload of a scheduled request
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Mobile   | injected by the host app |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided. \
//!                  Desktop: enable the desktop-shims feature. \
//!                  Mobile: inject a platform-native adapter.".to_string()
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across Tokio tasks behind an `Arc`.

pub mod background;
pub mod error;
pub mod http;
pub mod network;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{
    BackgroundExecutor, ExistingWorkPolicy, TaskConstraints, TaskId, TaskStatus, WorkHandler,
    WorkInfo, WorkOutcome, WorkRequest,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
