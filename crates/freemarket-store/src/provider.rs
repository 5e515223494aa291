//! Store manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use freemarket_core::config::StoreConfig;
use freemarket_core::error::AppError;
use freemarket_core::result::AppResult;
use freemarket_core::traits::capacity_store::{AdmitOutcome, AdmitRequest, CapacityStore};

/// Store manager that wraps the configured capacity store provider.
#[derive(Debug, Clone)]
pub struct StoreManager {
    /// The inner provider.
    inner: Arc<dyn CapacityStore>,
}

impl StoreManager {
    /// Create a new store manager from configuration.
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn CapacityStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis capacity store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisCapacityStore::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory capacity store");
                Arc::new(crate::memory::MemoryCapacityStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }
}

#[async_trait]
impl CapacityStore for StoreManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<bool> {
        self.inner.set_nx(key, value, ttl).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        self.inner.delete(key).await
    }

    async fn hash_set(&self, hash_key: &str, field: &str, value: &str) -> AppResult<()> {
        self.inner.hash_set(hash_key, field, value).await
    }

    async fn hash_exists(&self, hash_key: &str, field: &str) -> AppResult<bool> {
        self.inner.hash_exists(hash_key, field).await
    }

    async fn hash_delete(&self, hash_key: &str, field: &str) -> AppResult<bool> {
        self.inner.hash_delete(hash_key, field).await
    }

    async fn hash_len(&self, hash_key: &str) -> AppResult<u64> {
        self.inner.hash_len(hash_key).await
    }

    async fn hash_keys(&self, hash_key: &str) -> AppResult<Vec<String>> {
        self.inner.hash_keys(hash_key).await
    }

    async fn admit(&self, request: &AdmitRequest<'_>) -> AppResult<AdmitOutcome> {
        self.inner.admit(request).await
    }

    async fn reap(&self, hash_key: &str, field: &str, marker_key: &str) -> AppResult<bool> {
        self.inner.reap(hash_key, field, marker_key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freemarket_core::error::ErrorKind;

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let config = StoreConfig {
            provider: "memcached".to_string(),
            ..StoreConfig::default()
        };
        let err = StoreManager::new(&config).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_memory_provider_from_config() {
        let store = StoreManager::new(&StoreConfig::default()).await.unwrap();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(store.health_check().await.unwrap());
    }
}
