//! PixelScan command-line entry point.
//!
//! Thin shell: loads configuration, initializes tracing and wires the
//! Chromium launcher and HTTP prober into the scanner crates.

mod commands;

use commands::{CommandLine, Commands};
use pixelscan_core::{telemetry, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse_args();

    let mut config = AppConfig::load_with_env()?;
    cli.apply(&mut config);
    config.validate()?;

    telemetry::init_tracing(&config.logging.level);
    info!("Starting PixelScan v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Scan { input, batch_id } => {
            commands::scan::run(&config, &input, batch_id.as_deref()).await
        }
        Commands::Check { target } => commands::check::run(&config, &target).await,
        Commands::Config => commands::config::show(&config),
    }
}
