//! Event store trait and the in-memory implementation

use crate::error::Result;
use crate::models::{Event, EventType};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Durable keyed store for normalized events.
///
/// One logical writer (the ingestion job) runs alongside many readers. Every
/// call is its own atomic unit; implementations must never leave a partially
/// written record behind.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Insert the event, or replace the record already stored under its id
    async fn upsert(&self, event: &Event) -> Result<()>;

    /// Count records with `created_at >= cutoff`, grouped by type.
    ///
    /// Types without matches are absent from the map.
    async fn count_since(
        &self,
        cutoff: DateTime<Utc>,
        event_type: Option<EventType>,
    ) -> Result<HashMap<EventType, u64>>;

    /// `created_at` of every record matching type and repository, ascending
    async fn timestamps_for(
        &self,
        event_type: EventType,
        repo_full_name: &str,
    ) -> Result<Vec<DateTime<Utc>>>;

    /// Look up a single record by id
    async fn get(&self, id: &str) -> Result<Option<Event>>;

    /// Total number of stored records
    async fn count_all(&self) -> Result<u64>;
}

/// In-memory store, used in tests and for running without a database file
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<String, Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn upsert(&self, event: &Event) -> Result<()> {
        self.events.write().insert(event.id.clone(), event.clone());
        tracing::debug!("Upserted event {}", event.id);
        Ok(())
    }

    async fn count_since(
        &self,
        cutoff: DateTime<Utc>,
        event_type: Option<EventType>,
    ) -> Result<HashMap<EventType, u64>> {
        let events = self.events.read();
        let mut counts = HashMap::new();

        for event in events.values() {
            if event.created_at < cutoff {
                continue;
            }
            if event_type.is_some_and(|wanted| wanted != event.event_type) {
                continue;
            }
            *counts.entry(event.event_type).or_insert(0) += 1;
        }

        Ok(counts)
    }

    async fn timestamps_for(
        &self,
        event_type: EventType,
        repo_full_name: &str,
    ) -> Result<Vec<DateTime<Utc>>> {
        let events = self.events.read();
        let mut times: Vec<DateTime<Utc>> = events
            .values()
            .filter(|event| event.event_type == event_type && event.repo_name == repo_full_name)
            .map(|event| event.created_at)
            .collect();
        times.sort();
        Ok(times)
    }

    async fn get(&self, id: &str) -> Result<Option<Event>> {
        Ok(self.events.read().get(id).cloned())
    }

    async fn count_all(&self) -> Result<u64> {
        Ok(self.events.read().len() as u64)
    }
}
