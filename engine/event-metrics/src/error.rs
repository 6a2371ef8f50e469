//! Error types for metric queries

use event_store::StoreError;
use thiserror::Error;

/// Result type for metric queries
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors surfaced to callers of the metrics API
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Not enough observations to compute the metric; a user-facing condition
    #[error("Not enough data for a given metric (need {required}, found {found})")]
    InsufficientData { required: usize, found: usize },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl MetricsError {
    /// Whether this is a "not enough data" answer rather than a system fault
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, MetricsError::InsufficientData { .. })
    }
}
