//! PostgreSQL settings for the inventory ledger.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection pool and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Pool ceiling. Every in-flight purchase holds one connection until it
    /// commits or rolls back.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// How long a caller waits for a free connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    /// Session-wide `lock_timeout`. Purchase transactions override it with
    /// their own unit-of-work timeout.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_seconds: u64,
    /// Reported to the server as `application_name`.
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

impl DatabaseConfig {
    /// Settings for `url` with every other field at its default.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
            lock_timeout_seconds: default_lock_timeout(),
            application_name: default_application_name(),
        }
    }

    /// Connection acquire timeout.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    /// Session-wide lock wait limit.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_seconds)
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_lock_timeout() -> u64 {
    10
}

fn default_application_name() -> String {
    "freemarket".to_string()
}
