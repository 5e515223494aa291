//! Read and remove access to the session registry.
//!
//! Nothing here writes the limit key or admits tokens, so operator tooling
//! can inspect sessions without side effects.

use std::sync::Arc;

use freemarket_core::result::AppResult;
use freemarket_core::traits::CapacityStore;
use freemarket_store::keys;

/// View over the registry hash and the per-token markers.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    /// Shared capacity store.
    store: Arc<dyn CapacityStore>,
}

impl SessionRegistry {
    /// Creates a registry view.
    pub fn new(store: Arc<dyn CapacityStore>) -> Self {
        Self { store }
    }

    /// Checks whether `token` is registered and its marker is alive.
    pub async fn is_active(&self, token: &str) -> AppResult<bool> {
        if !self
            .store
            .hash_exists(keys::session_registry(), token)
            .await?
        {
            return Ok(false);
        }
        self.store.exists(&keys::session_marker(token)).await
    }

    /// Number of registered tokens, lapsed ones included.
    pub async fn count(&self) -> AppResult<u64> {
        self.store.hash_len(keys::session_registry()).await
    }

    /// Removes `token` from the registry and deletes its marker.
    pub async fn remove(&self, token: &str) -> AppResult<()> {
        self.store
            .hash_delete(keys::session_registry(), token)
            .await?;
        self.store.delete(&keys::session_marker(token)).await?;
        Ok(())
    }
}
