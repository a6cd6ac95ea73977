//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with streamed downloads
//! - `BackgroundExecutor` using Tokio tasks with unique-work semantics
//! - `NetworkMonitor` using a TCP reachability probe
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridge_desktop::{DesktopNetworkMonitor, ReqwestHttpClient, TokioBackgroundExecutor};
//!
//! let http_client = Arc::new(ReqwestHttpClient::new());
//! let monitor = Arc::new(DesktopNetworkMonitor::new());
//! let executor = Arc::new(TokioBackgroundExecutor::new().with_network_monitor(monitor));
//! ```

mod background;
mod http;
mod network;

pub use background::TokioBackgroundExecutor;
pub use http::ReqwestHttpClient;
pub use network::DesktopNetworkMonitor;
