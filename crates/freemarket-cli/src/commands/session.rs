//! Session registry CLI commands.

use clap::{Args, Subcommand};

use crate::output;
use freemarket_auth::{SessionLimitControl, SessionRegistry, SessionSweeper};
use freemarket_core::error::AppError;

/// Arguments for session commands
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Session subcommand
    #[command(subcommand)]
    pub command: SessionCommand,
}

/// Session subcommands
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Count registered sessions and show the limit in force
    Count,
    /// Check whether a token is active
    Check {
        /// Session token
        token: String,
    },
    /// Remove a token and its marker
    Delete {
        /// Session token
        token: String,
    },
    /// Run one reconciliation pass now
    Sweep,
}

/// Execute session commands
pub async fn execute(args: &SessionArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let store = super::create_store(&config).await?;
    let registry = SessionRegistry::new(store.clone());

    match &args.command {
        SessionCommand::Count => {
            output::print_kv("Registered sessions", &registry.count().await?.to_string());
            let limit = match SessionLimitControl::new(store).get().await? {
                Some(limit) => limit.to_string(),
                None => format!("{} (default, not stored)", config.session.default_limit),
            };
            output::print_kv("Limit", &limit);
            output::print_kv("Admission mode", &config.session.admission_mode.to_string());
        }
        SessionCommand::Check { token } => {
            if registry.is_active(token).await? {
                output::print_success("Session is active");
            } else {
                output::print_warning("Session is not active");
            }
        }
        SessionCommand::Delete { token } => {
            registry.remove(token).await?;
            output::print_success("Session removed");
        }
        SessionCommand::Sweep => {
            let sweeper = SessionSweeper::new(store, config.session.sweep_interval());
            let removed = sweeper.sweep_once().await?;
            output::print_success(&format!("Removed {removed} lapsed sessions"));
        }
    }

    Ok(())
}
