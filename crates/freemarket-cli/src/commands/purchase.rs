//! Purchase CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use validator::Validate;

use crate::output::{self, OutputFormat};
use freemarket_core::error::AppError;
use freemarket_core::types::{ItemId, PurchaseId, UserId};
use freemarket_database::PgInventoryLedger;
use freemarket_entity::purchase::{PurchaseRecord, PurchaseRequest};
use freemarket_service::PurchaseOrchestrator;

/// Arguments for purchase commands
#[derive(Debug, Args)]
pub struct PurchaseArgs {
    /// Purchase subcommand
    #[command(subcommand)]
    pub command: PurchaseCommand,
}

/// Purchase subcommands
#[derive(Debug, Subcommand)]
pub enum PurchaseCommand {
    /// Buy an item on behalf of a user
    Buy {
        /// Buyer ID
        #[arg(long)]
        user: i64,
        /// Item ID
        #[arg(long)]
        item: i64,
        /// Units to buy
        #[arg(long, default_value_t = 1)]
        quantity: i64,
    },
    /// List a user's purchases
    List {
        /// Buyer ID
        #[arg(long)]
        user: i64,
    },
    /// Show one purchase
    Show {
        /// Buyer ID
        #[arg(long)]
        user: i64,
        /// Purchase ID
        id: i64,
    },
}

/// Purchase display row
#[derive(Debug, Serialize, Tabled)]
struct PurchaseRow {
    /// Purchase ID
    id: i64,
    /// Item
    item: String,
    /// Unit price
    price: i64,
    /// Quantity
    quantity: i64,
    /// Total
    total_price: i64,
    /// Created
    created_at: String,
}

impl From<&PurchaseRecord> for PurchaseRow {
    fn from(record: &PurchaseRecord) -> Self {
        Self {
            id: record.id.get(),
            item: format!("{} ({})", record.item.name, record.item_id),
            price: record.price,
            quantity: record.quantity,
            total_price: record.total_price,
            created_at: record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Execute purchase commands
pub async fn execute(
    args: &PurchaseArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let db = super::create_db_pool(&config).await?;
    let orchestrator =
        PurchaseOrchestrator::new(Arc::new(PgInventoryLedger::new(db.clone())), &config.purchase);

    match &args.command {
        PurchaseCommand::Buy {
            user,
            item,
            quantity,
        } => {
            let request = PurchaseRequest {
                item_id: *item,
                quantity: *quantity,
            };
            request.validate()?;

            let record = orchestrator
                .purchase(UserId(*user), ItemId(request.item_id), request.quantity)
                .await?;
            output::print_item(&PurchaseRow::from(&record), format);
        }
        PurchaseCommand::List { user } => {
            let records = orchestrator.list_purchases(UserId(*user)).await?;
            let rows: Vec<PurchaseRow> = records.iter().map(PurchaseRow::from).collect();
            output::print_list(&rows, format);
        }
        PurchaseCommand::Show { user, id } => {
            let record = orchestrator
                .find_purchase(UserId(*user), PurchaseId(*id))
                .await?;
            match format {
                OutputFormat::Json => output::print_item(&PurchaseRow::from(&record), format),
                OutputFormat::Table => {
                    output::print_kv("Purchase", &record.id.to_string());
                    output::print_kv("Buyer", &record.user.id.to_string());
                    output::print_kv("Item", &record.item.name);
                    output::print_kv("Unit price", &record.price.to_string());
                    output::print_kv("Quantity", &record.quantity.to_string());
                    output::print_kv("Total", &record.total_price.to_string());
                    output::print_kv("Stock now", &record.item.quantity.to_string());
                }
            }
        }
    }

    db.close().await;
    Ok(())
}
