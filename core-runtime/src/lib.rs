//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the offline content engine:
//! - Logging and tracing infrastructure
//! - Configuration management and host capability wiring
//!
//! Every other crate in the workspace receives its host capabilities through
//! [`config::CoreConfig`] and reports through the subscriber installed by
//! [`logging::init_logging`].

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, FeatureFlags, DEFAULT_RECITER};
pub use error::{Error, Result};
