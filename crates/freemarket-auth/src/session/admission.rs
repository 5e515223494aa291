//! Session admission controller.
//!
//! A token is active when it is a field of the registry hash and its TTL
//! marker has not expired. Registration admits a token only while the
//! registry holds fewer entries than the current limit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use freemarket_core::config::{AdmissionMode, SessionConfig};
use freemarket_core::error::AppError;
use freemarket_core::result::AppResult;
use freemarket_core::traits::{AdmitOutcome, AdmitRequest, CapacityStore, parse_limit};
use freemarket_store::keys;

use super::registry::SessionRegistry;
use super::sweeper::{SessionSweeper, SweepHandle};

/// Outcome of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AdmissionResult {
    /// The token is now active.
    Admitted,
    /// The cap was reached; nothing was written.
    Denied {
        /// Registry size observed.
        size: u64,
        /// Limit in force.
        limit: u64,
    },
}

/// Admits, checks and removes session tokens.
#[derive(Debug)]
pub struct SessionAdmissionController {
    /// Shared capacity store.
    store: Arc<dyn CapacityStore>,
    /// Registry view over the same store.
    registry: SessionRegistry,
    /// Session configuration.
    config: SessionConfig,
    /// Set once the reconciliation sweep has been spawned.
    sweeper_started: AtomicBool,
}

impl SessionAdmissionController {
    /// Creates a controller and seeds the limit key with the configured
    /// default when no limit has been stored yet.
    pub async fn new(store: Arc<dyn CapacityStore>, config: SessionConfig) -> AppResult<Self> {
        let seeded = store
            .set_nx(
                keys::session_limit(),
                &config.default_limit.to_string(),
                None,
            )
            .await?;
        if seeded {
            info!(limit = config.default_limit, "Seeded session limit");
        }

        info!(
            mode = %config.admission_mode,
            ttl_minutes = config.ttl_minutes,
            "Session admission controller ready"
        );

        Ok(Self {
            registry: SessionRegistry::new(Arc::clone(&store)),
            store,
            config,
            sweeper_started: AtomicBool::new(false),
        })
    }

    /// Checks whether `token` is registered and its marker is alive.
    pub async fn exists(&self, token: &str) -> AppResult<bool> {
        self.registry.is_active(token).await
    }

    /// Attempts to admit `token`.
    pub async fn register(&self, token: &str) -> AppResult<AdmissionResult> {
        let result = match self.config.admission_mode {
            AdmissionMode::Atomic => self.register_atomic(token).await?,
            AdmissionMode::CheckThenAct => self.register_check_then_act(token).await?,
        };

        match result {
            AdmissionResult::Admitted => debug!("Session admitted"),
            AdmissionResult::Denied { size, limit } => {
                warn!(size, limit, "Session admission denied, limit reached")
            }
        }
        Ok(result)
    }

    /// Removes `token` from the registry and deletes its marker.
    pub async fn delete(&self, token: &str) -> AppResult<()> {
        self.registry.remove(token).await
    }

    /// Makes sure `token` is active, registering it if needed.
    ///
    /// A full registry yields an `AdmissionDenied` error, which callers must
    /// keep apart from authentication failures.
    pub async fn ensure_active(&self, token: &str) -> AppResult<()> {
        if self.exists(token).await? {
            return Ok(());
        }
        match self.register(token).await? {
            AdmissionResult::Admitted => Ok(()),
            AdmissionResult::Denied { size, limit } => Err(AppError::admission_denied(format!(
                "Session limit reached ({size}/{limit})"
            ))),
        }
    }

    /// Returns the limit in force: the stored value, or the configured
    /// default when none is stored.
    pub async fn limit(&self) -> AppResult<u64> {
        match self.store.get(keys::session_limit()).await? {
            Some(raw) => parse_limit(&raw),
            None => Ok(u64::from(self.config.default_limit)),
        }
    }

    /// Returns the number of registered tokens, lapsed ones included.
    pub async fn registered_count(&self) -> AppResult<u64> {
        self.registry.count().await
    }

    /// Spawns the reconciliation sweep. Fails if it is already running for
    /// this controller.
    pub fn start_sweeper(&self) -> AppResult<SweepHandle> {
        if self.sweeper_started.swap(true, Ordering::SeqCst) {
            return Err(AppError::internal("Session sweeper already started"));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = SessionSweeper::new(Arc::clone(&self.store), self.config.sweep_interval());
        let task = tokio::spawn(sweeper.run(shutdown_rx));

        info!(
            interval_seconds = self.config.sweep_interval_seconds,
            "Session sweeper started"
        );
        Ok(SweepHandle::new(shutdown_tx, task))
    }

    async fn register_atomic(&self, token: &str) -> AppResult<AdmissionResult> {
        let marker = keys::session_marker(token);
        let request = AdmitRequest {
            registry_key: keys::session_registry(),
            limit_key: keys::session_limit(),
            marker_key: &marker,
            token,
            default_limit: self.config.default_limit,
            ttl: self.config.ttl(),
        };

        Ok(match self.store.admit(&request).await? {
            AdmitOutcome::Admitted { .. } | AdmitOutcome::Refreshed => AdmissionResult::Admitted,
            AdmitOutcome::Denied { size, limit } => AdmissionResult::Denied { size, limit },
        })
    }

    /// Separate reads and writes. Concurrent calls can all pass the size
    /// check before any of them inserts.
    async fn register_check_then_act(&self, token: &str) -> AppResult<AdmissionResult> {
        let limit = self.limit().await?;
        let size = self.store.hash_len(keys::session_registry()).await?;
        if size >= limit {
            return Ok(AdmissionResult::Denied { size, limit });
        }

        self.store
            .hash_set(keys::session_registry(), token, "")
            .await?;
        self.store
            .set(&keys::session_marker(token), "", Some(self.config.ttl()))
            .await?;
        Ok(AdmissionResult::Admitted)
    }
}
