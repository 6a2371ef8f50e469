//! # Query API
//!
//! The operations an HTTP layer calls to answer metric requests.

use crate::aggregation::{average_inter_arrival, windowed_count};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use event_store::{EventStore, EventType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Response for the windowed count query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCountResponse {
    pub count: u64,
}

/// Response for the average pull request interval query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvgPullRequestTimeResponse {
    pub average_time_seconds: f64,
}

/// Read-side entry point over a shared event store
#[derive(Clone)]
pub struct MetricsService {
    store: Arc<dyn EventStore>,
}

impl MetricsService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Count of `event_type` events created in the last `offset_minutes`
    pub async fn windowed_count(
        &self,
        event_type: EventType,
        offset_minutes: u32,
    ) -> Result<EventCountResponse> {
        self.windowed_count_at(Utc::now(), event_type, offset_minutes).await
    }

    /// [`windowed_count`](Self::windowed_count) evaluated against a fixed `now`
    pub async fn windowed_count_at(
        &self,
        now: DateTime<Utc>,
        event_type: EventType,
        offset_minutes: u32,
    ) -> Result<EventCountResponse> {
        tracing::info!("Received request for {} count with offset {}", event_type, offset_minutes);

        let cutoff = cutoff_for(now, offset_minutes);
        let count = windowed_count(self.store.as_ref(), cutoff, event_type).await?;

        Ok(EventCountResponse { count })
    }

    /// Per-type counts over the last `offset_minutes`; absent types report 0
    pub async fn counts_since(&self, offset_minutes: u32) -> Result<HashMap<EventType, u64>> {
        let cutoff = cutoff_for(Utc::now(), offset_minutes);
        let mut counts = self.store.count_since(cutoff, None).await?;
        for event_type in EventType::ALL {
            counts.entry(event_type).or_insert(0);
        }
        Ok(counts)
    }

    /// Mean seconds between pull request events on `owner/repo`
    pub async fn average_pull_request_interval(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<AvgPullRequestTimeResponse> {
        let repo_full_name = format!("{owner}/{repo}");
        tracing::info!("Received request for average pull request interval for {}", repo_full_name);

        let times = self.store.timestamps_for(EventType::PullRequestEvent, &repo_full_name).await?;
        let average_time_seconds = average_inter_arrival(&times)?;

        Ok(AvgPullRequestTimeResponse { average_time_seconds })
    }
}

fn cutoff_for(now: DateTime<Utc>, offset_minutes: u32) -> DateTime<Utc> {
    now - Duration::minutes(i64::from(offset_minutes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;
    use chrono::TimeZone;
    use event_store::{Event, InMemoryEventStore, SqliteEventStore};

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, second).unwrap()
    }

    #[tokio::test]
    async fn test_windowed_count_uses_offset_from_now() {
        let store = Arc::new(InMemoryEventStore::new());
        store.upsert(&Event::new("1", EventType::WatchEvent, "a/b", at(9, 50, 0))).await.unwrap();
        store.upsert(&Event::new("2", EventType::WatchEvent, "a/b", at(9, 20, 0))).await.unwrap();
        store.upsert(&Event::new("3", EventType::IssuesEvent, "a/b", at(9, 55, 0))).await.unwrap();

        let service = MetricsService::new(store);
        let now = at(10, 0, 0);

        let last_15 = service.windowed_count_at(now, EventType::WatchEvent, 15).await.unwrap();
        assert_eq!(last_15, EventCountResponse { count: 1 });

        let last_60 = service.windowed_count_at(now, EventType::WatchEvent, 60).await.unwrap();
        assert_eq!(last_60.count, 2);

        let none = service.windowed_count_at(now, EventType::PullRequestEvent, 60).await.unwrap();
        assert_eq!(none.count, 0);
    }

    #[tokio::test]
    async fn test_windowed_count_sees_recent_events() {
        let store = Arc::new(InMemoryEventStore::new());
        let recent = Utc::now() - Duration::minutes(2);
        store.upsert(&Event::new("1", EventType::IssuesEvent, "a/b", recent)).await.unwrap();

        let service = MetricsService::new(store);
        assert_eq!(service.windowed_count(EventType::IssuesEvent, 10).await.unwrap().count, 1);
        assert_eq!(service.windowed_count(EventType::IssuesEvent, 1).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_counts_since_reports_every_type() {
        let store = Arc::new(InMemoryEventStore::new());
        let recent = Utc::now() - Duration::minutes(1);
        store.upsert(&Event::new("1", EventType::WatchEvent, "a/b", recent)).await.unwrap();

        let counts = MetricsService::new(store).counts_since(5).await.unwrap();
        assert_eq!(counts.len(), EventType::ALL.len());
        assert_eq!(counts[&EventType::WatchEvent], 1);
        assert_eq!(counts[&EventType::IssuesEvent], 0);
    }

    #[tokio::test]
    async fn test_average_pull_request_interval() {
        let store = Arc::new(SqliteEventStore::in_memory().await.unwrap());
        let repo = "octocat/Hello-World";
        store.upsert(&Event::new("3", EventType::PullRequestEvent, repo, at(10, 15, 0))).await.unwrap();
        store.upsert(&Event::new("1", EventType::PullRequestEvent, repo, at(10, 0, 0))).await.unwrap();
        store.upsert(&Event::new("2", EventType::PullRequestEvent, repo, at(10, 5, 0))).await.unwrap();
        // Other types and repositories do not contribute
        store.upsert(&Event::new("4", EventType::WatchEvent, repo, at(10, 1, 0))).await.unwrap();
        store
            .upsert(&Event::new("5", EventType::PullRequestEvent, "octocat/Spoon-Knife", at(9, 0, 0)))
            .await
            .unwrap();

        let service = MetricsService::new(store);
        let response = service.average_pull_request_interval("octocat", "Hello-World").await.unwrap();
        assert_eq!(response, AvgPullRequestTimeResponse { average_time_seconds: 450.0 });
    }

    #[tokio::test]
    async fn test_average_pull_request_interval_needs_two_events() {
        let store = Arc::new(InMemoryEventStore::new());
        store
            .upsert(&Event::new("1", EventType::PullRequestEvent, "octocat/Hello-World", at(10, 0, 0)))
            .await
            .unwrap();

        let service = MetricsService::new(store);
        let err = service.average_pull_request_interval("octocat", "Hello-World").await.unwrap_err();
        assert!(matches!(err, MetricsError::InsufficientData { found: 1, .. }));
        assert_eq!(err.to_string(), "Not enough data for a given metric (need 2, found 1)");
    }
}
