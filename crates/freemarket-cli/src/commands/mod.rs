//! CLI command definitions and dispatch.

pub mod migrate;
pub mod purchase;
pub mod session;
pub mod session_limit;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use freemarket_core::config::AppConfig;
use freemarket_core::error::AppError;
use freemarket_core::traits::CapacityStore;
use freemarket_database::DatabasePool;
use freemarket_store::StoreManager;

/// FreeMarket operator tools
#[derive(Debug, Parser)]
#[command(name = "freemarket", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Read or change the session limit
    SessionLimit(session_limit::SessionLimitArgs),
    /// Inspect and manage registered sessions
    Session(session::SessionArgs),
    /// Run or inspect purchases
    Purchase(purchase::PurchaseArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config, self.format).await,
            Commands::SessionLimit(args) => {
                session_limit::execute(args, &self.config, self.format).await
            }
            Commands::Session(args) => session::execute(args, &self.config).await,
            Commands::Purchase(args) => purchase::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_from(config_path)
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: connect to the configured capacity store
pub async fn create_store(config: &AppConfig) -> Result<Arc<dyn CapacityStore>, AppError> {
    Ok(Arc::new(StoreManager::new(&config.store).await?))
}
