//! FreeMarket Server
//!
//! Wires the ledger, the purchase orchestrator, the capacity store and the
//! session admission controller together and supervises the background
//! session sweep until shutdown.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use freemarket_auth::SessionAdmissionController;
use freemarket_core::config::AppConfig;
use freemarket_core::error::AppError;
use freemarket_core::traits::CapacityStore;
use freemarket_database::{DatabasePool, PgInventoryLedger};
use freemarket_service::{ItemService, PurchaseOrchestrator};
use freemarket_store::StoreManager;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("FREEMARKET_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env)?;
    config.validate()?;
    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting FreeMarket v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;
    freemarket_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Capacity store ───────────────────────────────────
    tracing::info!(provider = %config.store.provider, "Initializing capacity store");
    let store: Arc<dyn CapacityStore> = Arc::new(StoreManager::new(&config.store).await?);
    if !store.health_check().await? {
        return Err(AppError::store_unavailable("Capacity store health check failed"));
    }

    // ── Step 3: Services ─────────────────────────────────────────
    let ledger = Arc::new(PgInventoryLedger::new(db.clone()));
    let orchestrator = Arc::new(PurchaseOrchestrator::new(ledger.clone(), &config.purchase));
    let items = Arc::new(ItemService::new(ledger, &config.purchase));
    let admission =
        Arc::new(SessionAdmissionController::new(Arc::clone(&store), config.session.clone()).await?);
    tracing::info!(
        limit = admission.limit().await?,
        registered = admission.registered_count().await?,
        "Services initialized"
    );

    // ── Step 4: Background sweep ─────────────────────────────────
    let sweeper = admission.start_sweeper()?;

    tracing::info!("FreeMarket ready");

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    sweeper.shutdown().await;
    drop((orchestrator, items, admission));
    db.close().await;

    tracing::info!("FreeMarket shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
