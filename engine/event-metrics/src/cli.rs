//! # Command Line Interface
//!
//! Answers metric queries against a stored event database and prints the
//! JSON response bodies.

use crate::error::MetricsError;
use crate::query::MetricsService;
use anyhow::Result;
use clap::{Parser, Subcommand};
use event_store::{EventType, SqliteEventStore, StoreConfig};
use std::sync::Arc;

/// Metrics CLI for stored GitHub events
#[derive(Parser)]
#[command(name = "metrics-cli")]
#[command(about = "Query windowed counts and pull request intervals from stored GitHub events")]
pub struct Cli {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://github_events.db")]
    pub database_url: String,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count events of one type created in the last OFFSET minutes
    Count {
        /// WatchEvent, PullRequestEvent or IssuesEvent
        event_type: String,
        /// Minutes to look back
        offset: u32,
    },
    /// Count every tracked event type created in the last OFFSET minutes
    Counts {
        /// Minutes to look back
        offset: u32,
    },
    /// Average seconds between pull request events on OWNER/REPO
    PrInterval { owner: String, repo: String },
}

/// CLI handler
pub struct CliHandler {
    service: MetricsService,
}

impl CliHandler {
    /// Connect to the database named on the command line
    pub async fn new(database_url: &str) -> Result<Self> {
        let store = SqliteEventStore::connect(&StoreConfig::new(database_url)).await?;
        Ok(Self::with_service(MetricsService::new(Arc::new(store))))
    }

    pub fn with_service(service: MetricsService) -> Self {
        Self { service }
    }

    /// Run one command and return the JSON it prints
    pub async fn render(&self, command: Commands) -> Result<String> {
        let body = match command {
            Commands::Count { event_type, offset } => {
                let event_type: EventType = event_type.parse()?;
                serde_json::to_string_pretty(&self.service.windowed_count(event_type, offset).await?)?
            }
            Commands::Counts { offset } => {
                let counts = self.service.counts_since(offset).await?;
                let by_name: std::collections::BTreeMap<&str, u64> =
                    counts.into_iter().map(|(event_type, count)| (event_type.as_str(), count)).collect();
                serde_json::to_string_pretty(&by_name)?
            }
            Commands::PrInterval { owner, repo } => {
                match self.service.average_pull_request_interval(&owner, &repo).await {
                    Ok(response) => serde_json::to_string_pretty(&response)?,
                    Err(MetricsError::InsufficientData { .. }) => {
                        serde_json::to_string_pretty(&serde_json::json!({
                            "detail": "Not enough data for a given metric."
                        }))?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };
        Ok(body)
    }

    /// Handle CLI commands
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        println!("{}", self.render(command).await?);
        Ok(())
    }
}
