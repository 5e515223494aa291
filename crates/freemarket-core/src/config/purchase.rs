//! Purchase unit-of-work configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings applied to every purchase transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseConfig {
    /// Upper bound for one purchase unit of work, including the wait for the
    /// item row lock. On expiry the unit of work is rolled back.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl PurchaseConfig {
    /// The unit-of-work timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for PurchaseConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}
