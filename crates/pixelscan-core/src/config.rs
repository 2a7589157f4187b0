//! Configuration management for PixelScan.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for a single navigation, regardless of configuration.
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 60_000;

/// Main application configuration.
///
/// This is loaded from `~/.config/pixelscan/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Per-domain scanning behaviour
    pub scanning: ScanningConfig,
    /// Retry and backoff policy
    pub retry: RetryConfig,
    /// Address resolution probing
    pub resolver: ResolverConfig,
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Batch orchestration settings
    pub batch: BatchConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PIXELSCAN_HEADLESS`: Override browser headless mode (true/false)
    /// - `PIXELSCAN_MAX_CONCURRENT`: Override the number of in-flight scans
    /// - `PIXELSCAN_CHECKPOINT_EVERY`: Override the checkpoint interval
    /// - `PIXELSCAN_SETTLE_MS`: Override the post-navigation settle window
    /// - `PIXELSCAN_OUTPUT_DIR`: Override the batch output directory
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("PIXELSCAN_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("PIXELSCAN_MAX_CONCURRENT") {
            if let Ok(max) = val.parse() {
                self.scanning.max_concurrent = max;
                tracing::debug!("Override scanning.max_concurrent from env: {}", max);
            }
        }

        if let Some(val) = lookup("PIXELSCAN_CHECKPOINT_EVERY") {
            if let Ok(every) = val.parse() {
                self.batch.checkpoint_every = every;
                tracing::debug!("Override batch.checkpoint_every from env: {}", every);
            }
        }

        if let Some(val) = lookup("PIXELSCAN_SETTLE_MS") {
            if let Ok(settle) = val.parse() {
                self.scanning.settle_ms = settle;
                tracing::debug!("Override scanning.settle_ms from env: {}", settle);
            }
        }

        if let Some(val) = lookup("PIXELSCAN_OUTPUT_DIR") {
            if !val.trim().is_empty() {
                tracing::debug!("Override batch.output_dir from env: {}", val);
                self.batch.output_dir = Some(PathBuf::from(val));
            }
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scanning.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.max_concurrent".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.batch.checkpoint_every == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch.checkpoint_every".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.base_delay_ms".to_string(),
                reason: format!(
                    "base delay {}ms exceeds cap {}ms",
                    self.retry.base_delay_ms, self.retry.max_delay_ms
                ),
            });
        }

        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/pixelscan/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "pixelscan", "pixelscan").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/pixelscan`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "pixelscan", "pixelscan").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Directory where batch results, checkpoints and summaries are written.
    ///
    /// Falls back to `<data_dir>/batches` when `batch.output_dir` is unset.
    pub fn output_dir(&self) -> ConfigResult<PathBuf> {
        match &self.batch.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::data_dir()?.join("batches")),
        }
    }
}

/// Per-domain scanning behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Maximum number of scans (and browser sessions) in flight
    pub max_concurrent: usize,
    /// Navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,
    /// Wait after navigation so late-loading trackers can fire
    pub settle_ms: u64,
    /// Run the DNS/HTTP pre-check before spending a browser session
    pub health_check: bool,
    /// Capture a screenshot per scan (evidence only)
    pub capture_screenshots: bool,
}

impl ScanningConfig {
    /// Navigation timeout, clamped to [`MAX_NAVIGATION_TIMEOUT_MS`].
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms.min(MAX_NAVIGATION_TIMEOUT_MS))
    }

    /// Settle window as a `Duration`.
    #[must_use]
    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            navigation_timeout_ms: 30_000,
            settle_ms: 2_000,
            health_check: true,
            capture_screenshots: false,
        }
    }
}

/// Retry and backoff policy for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// First backoff delay in milliseconds, doubled per attempt
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

/// Address resolution probing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Timeout for a single connectivity probe in milliseconds
    pub probe_timeout_ms: u64,
    /// Redirects followed per probe
    pub max_redirects: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 10_000,
            max_redirects: 5,
        }
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Pass stealth launch settings to the browser
    pub stealth: bool,
    /// Additional Chromium command-line arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            stealth: true,
            extra_args: Vec::new(),
        }
    }
}

/// Batch orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Persist a checkpoint after this many terminal scans
    pub checkpoint_every: usize,
    /// Output directory (defaults to the data directory)
    pub output_dir: Option<PathBuf>,
    /// Batch-wide deadline in seconds
    pub deadline_secs: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            checkpoint_every: 10,
            output_dir: None,
            deadline_secs: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
