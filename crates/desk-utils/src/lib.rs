//! Shared utilities for stock-desk
//!
//! Logging setup and its configuration, used by the desk binaries.

pub mod config;
pub mod logging;

pub use config::{LogFormat, LoggingConfig};
pub use logging::init_tracing;
