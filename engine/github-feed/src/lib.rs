//! GitHub events ingestion
//!
//! Polls the public GitHub events feed, keeps the event types we track
//! (`WatchEvent`, `PullRequestEvent`, `IssuesEvent`) and upserts them into an
//! [`event_store::EventStore`] on a fixed interval.

pub mod config;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod scheduler;

pub use config::{FeedConfig, LoggingConfig, SchedulerConfig, ServiceConfig};
pub use fetcher::{normalize, FetchError, GitHubFeedFetcher, Rejection, GITHUB_V3_MEDIA_TYPE};
pub use logging::initialize_logging;
pub use models::{IngestionReport, JobOutcome, RawEvent, RawRepo};
pub use scheduler::{IngestionScheduler, SchedulerError, SchedulerState};
