//! Configuration for the event store

use serde::{Deserialize, Serialize};

/// Configuration for the event store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database URL (`sqlite://path/to/file.db` or `sqlite::memory:`)
    pub url: String,

    /// Connection pool size
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { url: "sqlite://github_events.db".to_string(), max_connections: 5 }
    }
}

impl StoreConfig {
    /// Create a new configuration for the given database URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Default::default() }
    }

    /// Whether the URL points at a private in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.url.starts_with("sqlite:") {
            return Err(format!("Store url must be a sqlite URL, got '{}'", self.url));
        }

        if self.max_connections == 0 {
            return Err("Store max_connections must be greater than 0".to_string());
        }

        Ok(())
    }
}
