//! Shared capacity store trait.
//!
//! The store is the single source of truth for session admission state.
//! Implementations must not cache values in-process: every call observes the
//! state shared by all nodes.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Parameters for one atomic admission attempt.
///
/// The store reads the limit at `limit_key` (falling back to
/// `default_limit` when absent), counts the fields of `registry_key`, and
/// only if the count is below the limit adds `token` to the registry and
/// writes `marker_key` with `ttl`. All of it happens as one operation.
#[derive(Debug, Clone)]
pub struct AdmitRequest<'a> {
    /// Hash holding one field per registered token.
    pub registry_key: &'a str,
    /// Key holding the configured limit.
    pub limit_key: &'a str,
    /// TTL-bearing marker key for this token.
    pub marker_key: &'a str,
    /// The session token being admitted.
    pub token: &'a str,
    /// Limit applied when `limit_key` does not exist.
    pub default_limit: u32,
    /// Marker lifetime.
    pub ttl: Duration,
}

/// Result of an atomic admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// The token was added; `size` is the registry size after insertion.
    Admitted {
        /// Registry size including the new token.
        size: u64,
    },
    /// The token was already registered; its marker was refreshed.
    Refreshed,
    /// The registry was full.
    Denied {
        /// Registry size at the time of the check.
        size: u64,
        /// Limit in force.
        limit: u64,
    },
}

/// Key/value store with per-key TTL and hash operations.
///
/// Each method is atomic on its own; only [`CapacityStore::admit`] and
/// [`CapacityStore::reap`] span several keys atomically, and the two never
/// interleave with each other.
#[async_trait]
pub trait CapacityStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value, with an optional TTL. `None` keeps the key until deleted.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()>;

    /// Set a value only if the key does not already exist (NX).
    /// Returns `true` if the value was set.
    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<bool>;

    /// Check whether a key exists and has not expired.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Delete a key. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// Set a field of a hash.
    async fn hash_set(&self, hash_key: &str, field: &str, value: &str) -> AppResult<()>;

    /// Check whether a hash field exists.
    async fn hash_exists(&self, hash_key: &str, field: &str) -> AppResult<bool>;

    /// Delete a field of a hash. Returns `true` if it existed.
    async fn hash_delete(&self, hash_key: &str, field: &str) -> AppResult<bool>;

    /// Count the fields of a hash.
    async fn hash_len(&self, hash_key: &str) -> AppResult<u64>;

    /// List the field names of a hash.
    async fn hash_keys(&self, hash_key: &str) -> AppResult<Vec<String>>;

    /// Conditionally register a token in one atomic step.
    async fn admit(&self, request: &AdmitRequest<'_>) -> AppResult<AdmitOutcome>;

    /// Remove `field` from `hash_key` only if `marker_key` no longer exists,
    /// in one atomic step. Returns `true` if the field was removed.
    async fn reap(&self, hash_key: &str, field: &str, marker_key: &str) -> AppResult<bool>;

    /// Check that the store backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Parse a stored session limit. Only positive integers are accepted.
pub fn parse_limit(raw: &str) -> AppResult<u64> {
    match raw.trim().parse::<u64>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(crate::error::AppError::configuration(format!(
            "Invalid session limit '{raw}': expected a positive integer"
        ))),
    }
}
