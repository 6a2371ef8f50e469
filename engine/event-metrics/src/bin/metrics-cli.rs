//! # Metrics CLI Binary
//!
//! Command-line interface for querying stored GitHub event metrics.

use anyhow::Result;
use clap::Parser;
use event_metrics::cli::{Cli, CliHandler};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Create CLI handler
    let handler = CliHandler::new(&cli.database_url).await?;

    // Handle command
    handler.handle_command(cli.command).await?;

    Ok(())
}
