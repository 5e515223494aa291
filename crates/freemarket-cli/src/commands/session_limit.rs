//! Session limit administration.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use freemarket_auth::SessionLimitControl;
use freemarket_core::error::AppError;

/// Arguments for session-limit commands
#[derive(Debug, Args)]
pub struct SessionLimitArgs {
    /// Session-limit subcommand
    #[command(subcommand)]
    pub command: SessionLimitCommand,
}

/// Session-limit subcommands
#[derive(Debug, Subcommand)]
pub enum SessionLimitCommand {
    /// Show the stored limit
    Get,
    /// Store a new limit (1 to 1000)
    Set {
        /// New limit
        limit: u32,
    },
}

/// Limit display row
#[derive(Debug, Serialize, Tabled)]
struct LimitRow {
    /// Stored limit
    limit: String,
}

/// Execute session-limit commands
pub async fn execute(
    args: &SessionLimitArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let control = SessionLimitControl::new(super::create_store(&config).await?);

    match &args.command {
        SessionLimitCommand::Get => {
            let limit = match control.get().await? {
                Some(limit) => limit.to_string(),
                None => {
                    output::print_warning(&format!(
                        "No limit stored; registrations use the default of {}",
                        config.session.default_limit
                    ));
                    return Ok(());
                }
            };
            output::print_item(&LimitRow { limit }, format);
        }
        SessionLimitCommand::Set { limit } => {
            control.set(*limit).await?;
            output::print_success(&format!("Session limit set to {limit}"));
        }
    }

    Ok(())
}
