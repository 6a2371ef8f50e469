use event_store::{EventStore, SqliteEventStore};
use github_feed::{initialize_logging, GitHubFeedFetcher, IngestionScheduler, ServiceConfig};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = ServiceConfig::from_env()?;
    initialize_logging(&config.logging)?;

    info!("Starting GitHub events ingestion service");
    info!(
        "Feed {} (page budget {}), store {}, interval {:?}",
        config.feed.base_url,
        config.feed.page_budget,
        config.store.url,
        config.scheduler.interval()
    );

    let store = Arc::new(SqliteEventStore::connect(&config.store).await?);
    info!("Event store ready with {} events", store.count_all().await?);

    let fetcher = Arc::new(GitHubFeedFetcher::new(config.feed.clone())?);
    let scheduler = IngestionScheduler::new(config.scheduler.clone(), fetcher, store.clone());

    scheduler.start()?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");

    scheduler.stop().await?;
    store.close().await;

    info!("GitHub events ingestion service stopped");
    Ok(())
}
