//! Seed the event store with random demo events
//!
//! Usage: `seed-events [COUNT]` (default 600). Honors `DATABASE_URL`.

use anyhow::Context;
use clap::Parser;
use chrono::{Duration, Utc};
use event_store::{Event, EventStore, EventType, SqliteEventStore};
use github_feed::ServiceConfig;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

const DEFAULT_EVENT_COUNT: usize = 600;

#[derive(Parser)]
#[command(name = "seed-events")]
#[command(about = "Write random demo events into the configured event store")]
struct Args {
    /// Number of events to write
    #[arg(default_value_t = DEFAULT_EVENT_COUNT)]
    count: usize,
}

const DEMO_REPOS: [&str; 4] = ["demo/repo1", "demo/repo2", "test/repo3", "example/repo4"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let count = Args::parse().count;

    let config = ServiceConfig::from_env()?;
    let store = SqliteEventStore::connect(&config.store).await?;
    info!("Seeding {} events into {}", count, config.store.url);

    let mut rng = rand::thread_rng();
    let now = Utc::now();

    for _ in 0..count {
        let event_type = *EventType::ALL.choose(&mut rng).context("No event types")?;
        let repo = *DEMO_REPOS.choose(&mut rng).context("No demo repositories")?;
        let created_at = now - Duration::minutes(rng.gen_range(1..=40));

        let event = Event::new(Uuid::new_v4().to_string(), event_type, repo, created_at);
        store.upsert(&event).await?;
    }

    info!("Store now holds {} events", store.count_all().await?);
    store.close().await;

    Ok(())
}
