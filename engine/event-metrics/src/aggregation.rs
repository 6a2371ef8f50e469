//! # Metric Aggregation
//!
//! Pure computations over the results of the store's two read queries.

use crate::error::{MetricsError, Result};
use chrono::{DateTime, Utc};
use event_store::{EventStore, EventType};

/// Minimum number of timestamps needed for one inter-arrival delta
pub const MIN_INTER_ARRIVAL_SAMPLES: usize = 2;

/// Mean gap between consecutive timestamps, in seconds.
///
/// `timestamps` must already be sorted ascending, as returned by
/// [`EventStore::timestamps_for`].
pub fn average_inter_arrival(timestamps: &[DateTime<Utc>]) -> Result<f64> {
    if timestamps.len() < MIN_INTER_ARRIVAL_SAMPLES {
        return Err(MetricsError::InsufficientData {
            required: MIN_INTER_ARRIVAL_SAMPLES,
            found: timestamps.len(),
        });
    }

    let deltas: Vec<f64> = timestamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 1000.0)
        .collect();

    Ok(deltas.iter().sum::<f64>() / deltas.len() as f64)
}

/// Number of `event_type` records created at or after `cutoff`
pub async fn windowed_count(
    store: &dyn EventStore,
    cutoff: DateTime<Utc>,
    event_type: EventType,
) -> Result<u64> {
    let counts = store.count_since(cutoff, Some(event_type)).await?;
    Ok(counts.get(&event_type).copied().unwrap_or(0))
}
