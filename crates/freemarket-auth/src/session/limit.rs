//! Operator control of the session limit.
//!
//! The limit is stored without TTL under a well-known key and read by every
//! registration, so changes apply to the next `register` call on every node.

use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::info;

use freemarket_core::error::AppError;
use freemarket_core::result::AppResult;
use freemarket_core::traits::{CapacityStore, parse_limit};
use freemarket_store::keys;

/// Limits an operator may set.
pub const LIMIT_RANGE: RangeInclusive<u32> = 1..=1000;

/// Reads and writes the stored session limit.
#[derive(Debug, Clone)]
pub struct SessionLimitControl {
    /// Shared capacity store.
    store: Arc<dyn CapacityStore>,
}

impl SessionLimitControl {
    /// Creates a new limit control.
    pub fn new(store: Arc<dyn CapacityStore>) -> Self {
        Self { store }
    }

    /// Returns the stored limit, or `None` when no limit is stored.
    pub async fn get(&self) -> AppResult<Option<u64>> {
        self.store
            .get(keys::session_limit())
            .await?
            .map(|raw| parse_limit(&raw))
            .transpose()
    }

    /// Stores a new limit.
    pub async fn set(&self, limit: u32) -> AppResult<()> {
        if !LIMIT_RANGE.contains(&limit) {
            return Err(AppError::validation(format!(
                "Session limit must be between {} and {}, got {limit}",
                LIMIT_RANGE.start(),
                LIMIT_RANGE.end()
            )));
        }

        self.store
            .set(keys::session_limit(), &limit.to_string(), None)
            .await?;

        info!(limit, "Session limit updated");
        Ok(())
    }
}
