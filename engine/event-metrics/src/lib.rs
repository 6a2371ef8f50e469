//! # Event Metrics
//!
//! Windowed event counts and pull request inter-arrival times over the
//! events collected by the ingestion service.
//!
//! - [`aggregation`]: pure metric functions over store query results
//! - [`query`]: [`MetricsService`], the operations exposed to an HTTP layer
//! - [`cli`]: command-line front end over the same service

pub mod aggregation;
pub mod cli;
pub mod error;
pub mod query;

pub use aggregation::{average_inter_arrival, windowed_count, MIN_INTER_ARRIVAL_SAMPLES};
pub use error::{MetricsError, Result};
pub use query::{AvgPullRequestTimeResponse, EventCountResponse, MetricsService};
