use crate::config::FeedConfig;
use crate::models::{IngestionReport, RawEvent};
use anyhow::{Context, Result};
use event_store::{parse_timestamp, Event, EventStore, EventType, StoreError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Media type for the GitHub REST v3 API
pub const GITHUB_V3_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Failure to obtain a page from the upstream feed
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request for page {page} failed: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("page {page} returned HTTP {status}")]
    Status { page: u32, status: StatusCode },

    #[error("page {page} is not a JSON array of events: {source}")]
    Decode {
        page: u32,
        #[source]
        source: reqwest::Error,
    },
}

/// Why a raw record did not become an [`Event`]
#[derive(Error, Debug)]
pub enum Rejection {
    /// Event type outside the tracked set; filtered, not an error
    #[error("unsupported event type '{0}'")]
    UnsupportedType(String),

    #[error("event {id} has malformed created_at '{value}': {source}")]
    MalformedTimestamp {
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("malformed record: {0}")]
    MalformedRecord(#[from] serde_json::Error),
}

/// Convert one upstream record into a normalized event
///
/// The type is checked before the rest of the record, so an untracked event is
/// filtered even when its other fields are missing.
pub fn normalize(raw: &Value) -> std::result::Result<Event, Rejection> {
    if let Some(kind) = raw.get("type").and_then(Value::as_str) {
        if kind.parse::<EventType>().is_err() {
            return Err(Rejection::UnsupportedType(kind.to_string()));
        }
    }

    let raw = RawEvent::deserialize(raw)?;

    let event_type: EventType =
        raw.kind.parse().map_err(|_| Rejection::UnsupportedType(raw.kind.clone()))?;

    let created_at = parse_timestamp(&raw.created_at).map_err(|source| {
        Rejection::MalformedTimestamp { id: raw.id.clone(), value: raw.created_at.clone(), source }
    })?;

    Ok(Event::new(raw.id, event_type, raw.repo.name, created_at))
}

/// Paginated client for the GitHub public events feed
pub struct GitHubFeedFetcher {
    config: FeedConfig,
    client: Client,
    events_url: String,
}

impl GitHubFeedFetcher {
    /// Create a new fetcher instance
    pub fn new(config: FeedConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_V3_MEDIA_TYPE));

        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("GitHub token is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        let events_url = format!("{}/events", config.base_url.trim_end_matches('/'));

        Ok(Self { config, client, events_url })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Fetch one page of raw records. Not retried.
    pub async fn fetch_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> std::result::Result<Vec<Value>, FetchError> {
        debug!("Fetching events page {} ({} per page) from {}", page, per_page, self.events_url);

        let response = self
            .client
            .get(&self.events_url)
            .query(&[("per_page", per_page), ("page", page)])
            .send()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { page, status });
        }

        response.json::<Vec<Value>>().await.map_err(|source| {
            if source.is_decode() {
                FetchError::Decode { page, source }
            } else {
                FetchError::Transport { page, source }
            }
        })
    }

    /// Page through the feed from page 1 to `page_budget`, storing every
    /// accepted event.
    ///
    /// An empty page or a fetch error ends the run early and the report
    /// carries what was stored so far. Storage errors abort the run.
    pub async fn fetch_and_store(
        &self,
        store: &dyn EventStore,
        page_budget: u32,
    ) -> std::result::Result<IngestionReport, StoreError> {
        let mut report = IngestionReport::default();

        for page in 1..=page_budget {
            let raw_events = match self.fetch_page(page, self.config.per_page).await {
                Ok(raw_events) => raw_events,
                Err(e) => {
                    error!("Failed to fetch events from GitHub API on page {}: {}", page, e);
                    report.halted_by = Some(e.to_string());
                    break;
                }
            };
            report.pages_fetched += 1;

            if raw_events.is_empty() {
                info!("Page {} returned no events", page);
                break;
            }
            report.records_seen += raw_events.len();

            let mut stored_on_page = 0;
            for raw in &raw_events {
                match normalize(raw) {
                    Ok(event) => {
                        store.upsert(&event).await?;
                        stored_on_page += 1;
                    }
                    Err(Rejection::UnsupportedType(kind)) => {
                        debug!("Skipping untracked {} on page {}", kind, page);
                        report.filtered += 1;
                    }
                    Err(rejection) => {
                        warn!("Dropping record on page {}: {}", page, rejection);
                        report.rejected += 1;
                    }
                }
            }
            report.stored += stored_on_page;

            info!(
                "Fetched {} events from page {}, stored {}",
                raw_events.len(),
                page,
                stored_on_page
            );

            if page < page_budget {
                sleep(self.config.page_delay()).await;
            }
        }

        info!("Total events stored: {}", report.stored);
        Ok(report)
    }

    /// Run one ingestion pass with the configured page budget
    pub async fn run_ingestion(
        &self,
        store: &dyn EventStore,
    ) -> std::result::Result<IngestionReport, StoreError> {
        self.fetch_and_store(store, self.config.page_budget).await
    }
}
