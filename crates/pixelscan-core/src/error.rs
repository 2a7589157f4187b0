//! Core error types for PixelScan.
//!
//! This module defines the central error type shared by the scanner crates.
//! Each subsystem keeps its own error enum; this one is the common currency
//! at crate boundaries and in the binary.

use thiserror::Error;

/// Central error type for PixelScan operations.
#[derive(Error, Debug)]
pub enum PixelScanError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (malformed targets, identifiers)
    #[error("validation error: {0}")]
    Validation(String),

    /// Network errors (DNS, HTTP probing)
    #[error("network error: {0}")]
    Network(String),

    /// Browser automation errors (launch, navigation)
    #[error("browser error: {0}")]
    Browser(String),

    /// Checkpoint persistence errors
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found (may be first run)
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `PixelScanError`.
pub type Result<T> = std::result::Result<T, PixelScanError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
