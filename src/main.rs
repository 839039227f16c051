//! Shipwright CLI entry point
//!
//! Publishes container image assets for deployment pipelines.

use clap::Parser;
use shipwright::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Publish(args) => shipwright::cli::publish::execute(args).await,
    }
}
