pub mod check;
pub mod config;
pub mod scan;

use clap::{Parser, Subcommand};
use pixelscan_browser::ChromiumLauncher;
use pixelscan_core::AppConfig;
use pixelscan_detectors::DetectorRegistry;
use pixelscan_resolver::HttpProber;
use pixelscan_scanner::ScanPipeline;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pixelscan")]
#[command(about = "Scan websites for third-party tracking pixels.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory for results, checkpoints and summaries
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of scans in flight
    #[arg(long, short = 'c', global = true)]
    pub concurrency: Option<usize>,

    /// Show the browser window
    #[arg(long, global = true)]
    pub headed: bool,

    /// Skip the DNS/HTTP pre-flight check
    #[arg(long, global = true)]
    pub no_health_check: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan every target in a domain list or CSV file
    #[command(alias = "s")]
    Scan {
        input: PathBuf,
        /// Resume (or name) a batch; a fresh id is generated when omitted
        #[arg(long, short = 'b')]
        batch_id: Option<String>,
    },
    /// Scan a single site and print its result
    #[command(alias = "c")]
    Check { target: String },
    /// Print the effective configuration
    Config,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Command-line flags take precedence over file and environment.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.output_dir {
            config.batch.output_dir = Some(dir.clone());
        }
        if let Some(max) = self.concurrency {
            config.scanning.max_concurrent = max;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if self.no_health_check {
            config.scanning.health_check = false;
        }
    }
}

/// Production pipeline: real network prober, Chromium sessions, built-in probes.
pub fn build_pipeline(config: &AppConfig) -> anyhow::Result<ScanPipeline> {
    let prober = Arc::new(HttpProber::new(&config.resolver)?);
    let registry = Arc::new(DetectorRegistry::with_default_probes());
    let pipeline = ScanPipeline::from_config(config, prober, Arc::new(ChromiumLauncher), registry);

    if config.scanning.capture_screenshots {
        let dir = config.output_dir()?.join("screenshots");
        return Ok(pipeline.with_screenshot_dir(dir));
    }
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        CommandLine::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = CommandLine::try_parse_from([
            "pixelscan",
            "scan",
            "sites.csv",
            "--batch-id",
            "clinics-2024",
            "-c",
            "3",
            "--headed",
            "--no-health-check",
        ])
        .expect("valid args");

        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.scanning.max_concurrent, 3);
        assert!(!config.browser.headless);
        assert!(!config.scanning.health_check);

        match cli.command {
            Commands::Scan { input, batch_id } => {
                assert_eq!(input, PathBuf::from("sites.csv"));
                assert_eq!(batch_id.as_deref(), Some("clinics-2024"));
            }
            _ => panic!("expected scan command"),
        }
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let cli = CommandLine::try_parse_from(["pixelscan", "config"]).expect("valid args");
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(
            config.scanning.max_concurrent,
            AppConfig::default().scanning.max_concurrent
        );
        assert!(config.batch.output_dir.is_none());
    }
}
