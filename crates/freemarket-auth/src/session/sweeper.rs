//! Background reconciliation of the session registry.
//!
//! Registry fields outlive their TTL markers. The sweep removes every field
//! whose marker is gone, restoring registry size to the number of active
//! sessions. Each removal re-checks the marker inside the store, so a token
//! refreshed by a concurrent registration is never evicted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use freemarket_core::result::AppResult;
use freemarket_core::traits::CapacityStore;
use freemarket_store::keys;

/// Removes lapsed registry entries.
#[derive(Debug, Clone)]
pub struct SessionSweeper {
    /// Shared capacity store.
    store: Arc<dyn CapacityStore>,
    /// Time between passes.
    interval: Duration,
}

impl SessionSweeper {
    /// Creates a new sweeper.
    pub fn new(store: Arc<dyn CapacityStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Runs one pass and returns the number of entries removed.
    ///
    /// Failures on individual tokens are logged and skipped.
    pub async fn sweep_once(&self) -> AppResult<u32> {
        let registry = keys::session_registry();
        let tokens = self.store.hash_keys(registry).await?;

        let mut removed = 0u32;
        for token in &tokens {
            match self
                .store
                .reap(registry, token, &keys::session_marker(token))
                .await
            {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Failed to reap lapsed session"),
            }
        }

        if removed > 0 {
            info!(removed, scanned = tokens.len(), "Session sweep completed");
        } else {
            debug!(scanned = tokens.len(), "Session sweep found nothing to remove");
        }
        Ok(removed)
    }

    /// Sweeps every interval until `shutdown` turns `true` or its sender is
    /// dropped. The first pass runs one interval after start.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Session sweeper received shutdown signal");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!(error = %e, "Session sweep failed");
                    }
                }
            }
        }
    }
}

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Wraps a spawned sweeper task and its shutdown channel.
    pub fn new(shutdown: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { shutdown, task }
    }

    /// Signals the sweeper to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Session sweeper task failed");
        }
        info!("Session sweeper stopped");
    }
}
