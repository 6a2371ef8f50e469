//! # Event Store
//!
//! Durable keyed storage for normalized GitHub events, and the two read
//! queries the metrics layer is built on.
//!
//! ## Architecture
//!
//! - **EventStore**: async trait shared by the ingestion writer and the query readers
//! - **SqliteEventStore**: single `events` table, one atomic upsert statement per event
//! - **InMemoryEventStore**: map-backed implementation for tests and demos
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use event_store::{Event, EventStore, EventType, SqliteEventStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteEventStore::in_memory().await?;
//!
//!     let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
//!     let event = Event::new("1", EventType::WatchEvent, "octocat/Hello-World", created_at);
//!     store.upsert(&event).await?;
//!     store.upsert(&event).await?;
//!
//!     assert_eq!(store.count_all().await?, 1);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod sqlite;

pub use backend::{EventStore, InMemoryEventStore};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use models::{
    cutoff_key, format_timestamp, parse_timestamp, Event, EventType, UnknownEventType,
    TIMESTAMP_FORMAT,
};
pub use sqlite::SqliteEventStore;

pub use chrono::{DateTime, Utc};
