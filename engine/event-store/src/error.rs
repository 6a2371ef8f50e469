//! Error types for the event store

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the event store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Storage unavailable, connection or query failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be read back (bad timestamp, unknown event type)
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Create a new corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
