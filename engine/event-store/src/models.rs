use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical storage form of `created_at`: UTC, second precision.
///
/// Values in this format sort lexicographically in time order, which is what
/// the windowed count relies on when comparing against a cutoff.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Event types this system tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    WatchEvent,
    PullRequestEvent,
    IssuesEvent,
}

impl EventType {
    /// Every tracked type, in declaration order
    pub const ALL: [EventType; 3] =
        [EventType::WatchEvent, EventType::PullRequestEvent, EventType::IssuesEvent];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::WatchEvent => "WatchEvent",
            EventType::PullRequestEvent => "PullRequestEvent",
            EventType::IssuesEvent => "IssuesEvent",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names a type outside the tracked set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid event_type '{value}'. Allowed values are: {}", allowed_event_types())]
pub struct UnknownEventType {
    pub value: String,
}

fn allowed_event_types() -> String {
    EventType::ALL.iter().map(EventType::as_str).collect::<Vec<_>>().join(", ")
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event_type| event_type.as_str() == s)
            .ok_or_else(|| UnknownEventType { value: s.to_string() })
    }
}

/// One observed occurrence from the upstream feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Upstream id, the idempotency key
    pub id: String,
    pub event_type: EventType,
    /// `"<owner>/<name>"`
    pub repo_name: String,
    /// Upstream-supplied creation time, second precision
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Build an event, dropping any sub-second part of `created_at`
    pub fn new(
        id: impl Into<String>,
        event_type: EventType,
        repo_name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type,
            repo_name: repo_name.into(),
            created_at: created_at.trunc_subsecs(0),
        }
    }

    /// `created_at` in its canonical stored form
    pub fn created_at_key(&self) -> String {
        format_timestamp(&self.created_at)
    }
}

/// Format a timestamp in the canonical stored form
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in the canonical form (`2024-01-01T10:00:00Z`)
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

/// Stored key to compare against for `created_at >= cutoff`.
///
/// Records carry whole seconds, so a cutoff inside a second is moved up to the
/// next whole second.
pub fn cutoff_key(cutoff: &DateTime<Utc>) -> String {
    let whole = cutoff.trunc_subsecs(0);
    if cutoff.nanosecond() > 0 {
        format_timestamp(&(whole + Duration::seconds(1)))
    } else {
        format_timestamp(&whole)
    }
}
