//! In-memory capacity store with per-key TTL.
//!
//! Expiry is measured on the tokio clock so tests can drive it with
//! `tokio::time::pause` and `advance`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use freemarket_core::result::AppResult;
use freemarket_core::traits::capacity_store::{
    AdmitOutcome, AdmitRequest, CapacityStore, parse_limit,
};

/// A plain value with its optional deadline.
#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory capacity store.
///
/// Suitable for single-node deployments and tests only: state is not
/// shared between processes.
#[derive(Debug, Clone, Default)]
pub struct MemoryCapacityStore {
    /// Plain keys.
    values: Arc<DashMap<String, StoredValue>>,
    /// Hash keys.
    hashes: Arc<DashMap<String, HashMap<String, String>>>,
    /// Serializes [`CapacityStore::admit`] and [`CapacityStore::reap`] calls.
    admission: Arc<Mutex<()>>,
}

impl MemoryCapacityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a live value, evicting it if its TTL has passed.
    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let expired = match self.values.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.values.remove_if(key, |_, entry| entry.is_expired(now));
            debug!(key, "Evicted expired key");
        }
        None
    }

    fn field_exists(&self, hash_key: &str, field: &str) -> bool {
        self.hashes
            .get(hash_key)
            .is_some_and(|hash| hash.contains_key(field))
    }

    fn field_count(&self, hash_key: &str) -> u64 {
        self.hashes
            .get(hash_key)
            .map(|hash| hash.len() as u64)
            .unwrap_or(0)
    }

    fn remove_field(&self, hash_key: &str, field: &str) -> bool {
        let removed = match self.hashes.get_mut(hash_key) {
            Some(mut hash) => hash.remove(field).is_some(),
            None => false,
        };
        // An empty hash disappears, as in Redis.
        self.hashes.remove_if(hash_key, |_, hash| hash.is_empty());
        removed
    }

    fn insert_field(&self, hash_key: &str, field: &str, value: &str) {
        self.hashes
            .entry(hash_key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }
}

#[async_trait]
impl CapacityStore for MemoryCapacityStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        self.values.insert(key.to_string(), StoredValue::new(value, ttl));
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<bool> {
        let now = Instant::now();
        match self.values.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(StoredValue::new(value, ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(StoredValue::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.live_value(key).is_some())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let now = Instant::now();
        let removed = self.values.remove(key);
        let hash_removed = self.hashes.remove(key).is_some();
        Ok(removed.is_some_and(|(_, entry)| !entry.is_expired(now)) || hash_removed)
    }

    async fn hash_set(&self, hash_key: &str, field: &str, value: &str) -> AppResult<()> {
        self.insert_field(hash_key, field, value);
        Ok(())
    }

    async fn hash_exists(&self, hash_key: &str, field: &str) -> AppResult<bool> {
        Ok(self.field_exists(hash_key, field))
    }

    async fn hash_delete(&self, hash_key: &str, field: &str) -> AppResult<bool> {
        Ok(self.remove_field(hash_key, field))
    }

    async fn hash_len(&self, hash_key: &str) -> AppResult<u64> {
        Ok(self.field_count(hash_key))
    }

    async fn hash_keys(&self, hash_key: &str) -> AppResult<Vec<String>> {
        Ok(self
            .hashes
            .get(hash_key)
            .map(|hash| hash.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn admit(&self, request: &AdmitRequest<'_>) -> AppResult<AdmitOutcome> {
        let _guard = self.admission.lock().await;

        let limit = match self.live_value(request.limit_key) {
            Some(raw) => parse_limit(&raw)?,
            None => u64::from(request.default_limit),
        };

        if self.field_exists(request.registry_key, request.token) {
            self.values.insert(
                request.marker_key.to_string(),
                StoredValue::new("", Some(request.ttl)),
            );
            return Ok(AdmitOutcome::Refreshed);
        }

        let size = self.field_count(request.registry_key);
        if size >= limit {
            return Ok(AdmitOutcome::Denied { size, limit });
        }

        self.insert_field(request.registry_key, request.token, "");
        self.values.insert(
            request.marker_key.to_string(),
            StoredValue::new("", Some(request.ttl)),
        );

        Ok(AdmitOutcome::Admitted { size: size + 1 })
    }

    async fn reap(&self, hash_key: &str, field: &str, marker_key: &str) -> AppResult<bool> {
        let _guard = self.admission.lock().await;

        if self.live_value(marker_key).is_some() {
            return Ok(false);
        }
        Ok(self.remove_field(hash_key, field))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
