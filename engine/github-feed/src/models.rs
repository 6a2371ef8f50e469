use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub events API record, reduced to the fields we read
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RawEvent {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub repo: RawRepo,

    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub created_at: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RawRepo {
    /// `"<owner>/<name>"`
    pub name: String,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    /// Pages that returned a response, including a final empty page
    pub pages_fetched: u32,

    /// Raw records received across all pages
    pub records_seen: usize,

    /// Events accepted and upserted
    pub stored: usize,

    /// Records with an event type we do not track
    pub filtered: usize,

    /// Records dropped as malformed
    pub rejected: usize,

    /// Fetch error that ended the run before the page budget, if any
    pub halted_by: Option<String>,
}

/// Outcome of one scheduler tick, as published to subscribers
#[derive(Debug, Clone, Serialize)]
pub enum JobOutcome {
    /// Ingestion ran to completion (possibly ended early by a fetch error)
    Succeeded {
        job_id: u64,
        report: IngestionReport,
        finished_at: DateTime<Utc>,
    },

    /// Ingestion returned a storage error or panicked
    Failed {
        job_id: u64,
        error: String,
        finished_at: DateTime<Utc>,
    },

    /// Tick arrived while the previous job was still in flight
    Skipped {
        job_id: u64,
        at: DateTime<Utc>,
    },
}

impl JobOutcome {
    pub fn job_id(&self) -> u64 {
        match self {
            JobOutcome::Succeeded { job_id, .. }
            | JobOutcome::Failed { job_id, .. }
            | JobOutcome::Skipped { job_id, .. } => *job_id,
        }
    }
}
