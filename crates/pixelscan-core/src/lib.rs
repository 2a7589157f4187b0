//! PixelScan Core - Foundation crate for the PixelScan tracking-pixel scanner.
//!
//! This crate provides shared types, error handling, configuration management,
//! and logging setup that all other PixelScan crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes and enums (`BatchId`, `TrackerType`, `ErrorKind`, `Timestamp`)
//! - [`telemetry`] - `tracing` subscriber initialisation
//!
//! # Example
//!
//! ```rust
//! use pixelscan_core::{AppConfig, TrackerType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! config.validate()?;
//!
//! for tracker in TrackerType::ALL {
//!     println!("{tracker}: {:?}", tracker.risk_level());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BatchConfig, BrowserConfig, LoggingConfig, ResolverConfig, RetryConfig,
    ScanningConfig,
};
pub use error::{ConfigError, ConfigResult, PixelScanError, Result};
pub use types::{BatchId, ErrorKind, RiskLevel, ScanStatus, Timestamp, TrackerType};
