use chrono::{TimeZone, Utc};
use event_metrics::MetricsService;
use event_store::{EventStore, EventType, SqliteEventStore, StoreConfig};
use github_feed::{
    FeedConfig, GitHubFeedFetcher, IngestionScheduler, JobOutcome, SchedulerConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::{sleep, timeout, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pull_request(id: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "type": "PullRequestEvent",
        "actor": { "login": "octocat" },
        "repo": { "id": 1296269, "name": "octocat/Hello-World" },
        "payload": { "action": "opened" },
        "created_at": created_at
    })
}

async fn github_with_pull_requests() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            pull_request("101", "2024-03-01T10:00:00Z"),
            pull_request("102", "2024-03-01T10:05:00Z"),
            {
                "id": "103",
                "type": "ForkEvent",
                "repo": { "name": "octocat/Hello-World" },
                "created_at": "2024-03-01T10:07:00Z"
            },
            pull_request("104", "2024-03-01T10:15:00Z")
        ])))
        .mount(&server)
        .await;

    server
}

fn feed_config(server: &MockServer) -> FeedConfig {
    FeedConfig { base_url: server.uri(), page_delay_ms: 0, ..FeedConfig::default() }
}

#[tokio::test]
async fn test_ingested_pull_requests_drive_average_interval() {
    let server = github_with_pull_requests().await;
    let store = Arc::new(SqliteEventStore::in_memory().await.unwrap());
    let fetcher = GitHubFeedFetcher::new(feed_config(&server)).unwrap();

    let report = fetcher.fetch_and_store(store.as_ref(), 1).await.unwrap();
    assert_eq!(report.records_seen, 4);
    assert_eq!(report.stored, 3);
    assert_eq!(report.filtered, 1);
    assert!(report.halted_by.is_none());

    let metrics = MetricsService::new(store.clone());
    let average = metrics.average_pull_request_interval("octocat", "Hello-World").await.unwrap();
    assert_eq!(average.average_time_seconds, 450.0);

    // All three fall inside a 20 minute window ending at 10:16
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 16, 0).unwrap();
    let count =
        metrics.windowed_count_at(now, EventType::PullRequestEvent, 20).await.unwrap();
    assert_eq!(count.count, 3);

    // Cutoff 10:06 drops the first two
    let count = metrics.windowed_count_at(now, EventType::PullRequestEvent, 10).await.unwrap();
    assert_eq!(count.count, 1);

    // Re-ingesting the same page changes nothing
    fetcher.fetch_and_store(store.as_ref(), 1).await.unwrap();
    assert_eq!(store.count_all().await.unwrap(), 3);
}

#[tokio::test]
async fn test_scheduler_populates_store_for_metrics() {
    let server = github_with_pull_requests().await;
    let store = Arc::new(SqliteEventStore::in_memory().await.unwrap());
    let fetcher = Arc::new(GitHubFeedFetcher::new(feed_config(&server)).unwrap());

    let scheduler = IngestionScheduler::new(
        SchedulerConfig { interval_ms: 60_000, run_on_start: true },
        fetcher,
        store.clone(),
    );
    let mut outcomes = scheduler.subscribe();

    scheduler.start().unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), outcomes.recv())
        .await
        .expect("first tick did not finish")
        .unwrap();
    scheduler.stop().await.unwrap();

    match outcome {
        JobOutcome::Succeeded { report, .. } => assert_eq!(report.stored, 3),
        other => panic!("Expected success, got {other:?}"),
    }

    let metrics = MetricsService::new(store.clone());
    let average = metrics.average_pull_request_interval("octocat", "Hello-World").await.unwrap();
    assert_eq!(average.average_time_seconds, 450.0);

    let unknown = metrics.average_pull_request_interval("octocat", "Spoon-Knife").await;
    assert!(unknown.unwrap_err().is_insufficient_data());
}

#[tokio::test]
async fn test_queries_answer_while_ingestion_is_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            pull_request("201", "2024-03-01T10:00:00Z"),
            pull_request("202", "2024-03-01T10:05:00Z")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            pull_request("203", "2024-03-01T10:15:00Z")
        ])))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", temp_dir.path().join("events.db").display());
    let store = Arc::new(SqliteEventStore::connect(&StoreConfig::new(url)).await.unwrap());

    // The job sits in the inter-page delay for most of its run
    let feed = FeedConfig { page_budget: 2, page_delay_ms: 800, ..feed_config(&server) };
    let fetcher = Arc::new(GitHubFeedFetcher::new(feed).unwrap());
    let scheduler = IngestionScheduler::new(
        SchedulerConfig { interval_ms: 60_000, run_on_start: true },
        fetcher,
        store.clone(),
    );
    let mut outcomes = scheduler.subscribe();
    scheduler.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while store.count_all().await.unwrap() < 2 {
        assert!(Instant::now() < deadline, "first page was never stored");
        sleep(Duration::from_millis(10)).await;
    }
    assert!(scheduler.is_busy());

    let metrics = MetricsService::new(store.clone());
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 16, 0).unwrap();
    let count = timeout(
        Duration::from_millis(250),
        metrics.windowed_count_at(now, EventType::PullRequestEvent, 20),
    )
    .await
    .expect("query waited on the ingestion job")
    .unwrap();
    assert_eq!(count.count, 2);

    // The job is still running when the answer comes back
    assert!(matches!(outcomes.try_recv(), Err(TryRecvError::Empty)));
    assert!(scheduler.is_busy());

    let outcome = timeout(Duration::from_secs(5), outcomes.recv())
        .await
        .expect("job did not finish")
        .unwrap();
    scheduler.stop().await.unwrap();

    match outcome {
        JobOutcome::Succeeded { report, .. } => {
            assert_eq!(report.pages_fetched, 2);
            assert_eq!(report.stored, 3);
        }
        other => panic!("Expected success, got {other:?}"),
    }

    let count = metrics.windowed_count_at(now, EventType::PullRequestEvent, 20).await.unwrap();
    assert_eq!(count.count, 3);
    store.close().await;
}
