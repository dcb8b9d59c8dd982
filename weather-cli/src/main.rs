//! Binary crate for the `weather-app` command-line client.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration and credential prompts
//! - Human-friendly output formatting

use clap::Parser;
use tracing_subscriber::EnvFilter;
use weather_app_core::Config;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    let config = Config::load()?.with_env_overrides();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    cmd.run(config).await
}
