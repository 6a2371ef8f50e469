//! SQLite-backed event store

use crate::backend::EventStore;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::models::{cutoff_key, parse_timestamp, Event, EventType};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;

const CREATE_EVENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY NOT NULL,
        event_type TEXT NOT NULL,
        repo_name TEXT NOT NULL,
        created_at TEXT NOT NULL CHECK (
            created_at GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]T[0-9][0-9]:[0-9][0-9]:[0-9][0-9]Z'
        )
    )
"#;

/// GLOB matching `TIMESTAMP_FORMAT` text; must agree with the table CHECK
const CANONICAL_TIMESTAMP_GLOB: &str =
    "[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]T[0-9][0-9]:[0-9][0-9]:[0-9][0-9]Z";

const CREATE_TYPE_TIME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_events_type_created ON events (event_type, created_at)";

const CREATE_TYPE_REPO_TIME_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_events_type_repo_created \
     ON events (event_type, repo_name, created_at)";

/// Event store persisted in a single SQLite table
#[derive(Debug, Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Wrap an existing pool. The caller is responsible for `initialize`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database described by `config` and create the schema
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::config)?;

        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        // A private in-memory database lives and dies with its connection, so
        // the pool must hold exactly one and never recycle it.
        let pool = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        let store = Self::new(pool);
        store.initialize().await?;

        tracing::info!("SQLite event store ready at {}", config.url);
        Ok(store)
    }

    /// Fresh private in-memory database with the schema applied
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&StoreConfig::new("sqlite::memory:")).await
    }

    /// Create the events table and its query indexes if missing
    pub async fn initialize(&self) -> Result<()> {
        for statement in [CREATE_EVENTS_TABLE, CREATE_TYPE_TIME_INDEX, CREATE_TYPE_REPO_TIME_INDEX] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_event_type(value: &str) -> Result<EventType> {
    EventType::from_str(value)
        .map_err(|_| StoreError::corruption(format!("unknown stored event_type '{value}'")))
}

fn parse_created_at(value: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(value)
        .map_err(|e| StoreError::corruption(format!("malformed stored created_at '{value}': {e}")))
}

#[async_trait::async_trait]
impl EventStore for SqliteEventStore {
    async fn upsert(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, event_type, repo_name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (id)
            DO UPDATE SET
                event_type = excluded.event_type,
                repo_name = excluded.repo_name,
                created_at = excluded.created_at
            "#,
        )
        .bind(event.id.as_str())
        .bind(event.event_type.as_str())
        .bind(event.repo_name.as_str())
        .bind(event.created_at_key())
        .execute(&self.pool)
        .await?;

        tracing::debug!("Upserted event {}", event.id);
        Ok(())
    }

    async fn count_since(
        &self,
        cutoff: DateTime<Utc>,
        event_type: Option<EventType>,
    ) -> Result<HashMap<EventType, u64>> {
        let cutoff = cutoff_key(&cutoff);

        // Malformed text would compare against the cutoff as a plain string
        let malformed: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM events
            WHERE (?1 IS NULL OR event_type = ?1) AND created_at NOT GLOB ?2
            "#,
        )
        .bind(event_type.map(|event_type| event_type.as_str()))
        .bind(CANONICAL_TIMESTAMP_GLOB)
        .fetch_one(&self.pool)
        .await?;

        if malformed > 0 {
            return Err(StoreError::corruption(format!(
                "{malformed} stored created_at value(s) are not in canonical form"
            )));
        }

        let rows: Vec<(String, i64)> = match event_type {
            Some(event_type) => {
                sqlx::query_as(
                    r#"
                    SELECT event_type, COUNT(*) AS count
                    FROM events
                    WHERE created_at >= ?1 AND event_type = ?2
                    GROUP BY event_type
                    "#,
                )
                .bind(cutoff.as_str())
                .bind(event_type.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT event_type, COUNT(*) AS count
                    FROM events
                    WHERE created_at >= ?1
                    GROUP BY event_type
                    "#,
                )
                .bind(cutoff.as_str())
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut counts = HashMap::with_capacity(rows.len());
        for (event_type, count) in rows {
            counts.insert(parse_event_type(&event_type)?, count as u64);
        }

        tracing::debug!("Counted events since {}: {:?}", cutoff, counts);
        Ok(counts)
    }

    async fn timestamps_for(
        &self,
        event_type: EventType,
        repo_full_name: &str,
    ) -> Result<Vec<DateTime<Utc>>> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT created_at
            FROM events
            WHERE event_type = ?1 AND repo_name = ?2
            ORDER BY created_at ASC
            "#,
        )
        .bind(event_type.as_str())
        .bind(repo_full_name)
        .fetch_all(&self.pool)
        .await?;

        let times = rows.iter().map(|value| parse_created_at(value)).collect::<Result<Vec<_>>>()?;

        tracing::debug!("Retrieved {} {} timestamps for {}", times.len(), event_type, repo_full_name);
        Ok(times)
    }

    async fn get(&self, id: &str) -> Result<Option<Event>> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT id, event_type, repo_name, created_at FROM events WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, event_type, repo_name, created_at)| {
            Ok(Event {
                id,
                event_type: parse_event_type(&event_type)?,
                repo_name,
                created_at: parse_created_at(&created_at)?,
            })
        })
        .transpose()
    }

    async fn count_all(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events").fetch_one(&self.pool).await?;
        Ok(count as u64)
    }
}
