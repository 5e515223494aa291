//! Purchase orchestration: one atomic unit of work per purchase.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use freemarket_core::config::PurchaseConfig;
use freemarket_core::error::AppError;
use freemarket_core::result::AppResult;
use freemarket_core::types::{ItemId, PurchaseId, UserId};
use freemarket_database::ledger::{InventoryLedger, LedgerTransaction};
use freemarket_entity::purchase::{NewPurchase, PurchaseRecord};

use super::error::PurchaseError;

/// Runs purchases against an inventory ledger.
#[derive(Debug, Clone)]
pub struct PurchaseOrchestrator {
    /// Ledger providing units of work.
    ledger: Arc<dyn InventoryLedger>,
    /// Upper bound for a whole unit of work.
    timeout: Duration,
}

impl PurchaseOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(ledger: Arc<dyn InventoryLedger>, config: &PurchaseConfig) -> Self {
        Self {
            ledger,
            timeout: config.timeout(),
        }
    }

    /// Buy `quantity` units of `item_id` as `user_id`.
    ///
    /// On success exactly one item row was decremented and one purchase
    /// row inserted; on any error neither happened.
    pub async fn purchase(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<PurchaseRecord, PurchaseError> {
        if quantity <= 0 {
            return Err(PurchaseError::Invalid(format!(
                "quantity must be positive, got {quantity}"
            )));
        }

        let work = async {
            let tx = self.ledger.begin(self.timeout).await?;
            Self::run(tx, user_id, item_id, quantity).await
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(Ok(record)) => {
                info!(
                    purchase_id = %record.id,
                    user_id = %user_id,
                    item_id = %item_id,
                    quantity,
                    total_price = record.total_price,
                    "Purchase committed"
                );
                Ok(record)
            }
            Ok(Err(e)) => {
                debug!(user_id = %user_id, item_id = %item_id, quantity, error = %e, "Purchase rejected");
                Err(e)
            }
            Err(_) => {
                warn!(
                    user_id = %user_id,
                    item_id = %item_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Purchase timed out, rolled back"
                );
                Err(PurchaseError::TransactionAborted(format!(
                    "unit of work exceeded {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }

    /// List the purchases of a user, newest first.
    pub async fn list_purchases(&self, user_id: UserId) -> AppResult<Vec<PurchaseRecord>> {
        self.ledger.list_purchases(user_id).await
    }

    /// Read one purchase of a user.
    pub async fn find_purchase(
        &self,
        user_id: UserId,
        purchase_id: PurchaseId,
    ) -> AppResult<PurchaseRecord> {
        self.ledger
            .find_purchase(user_id, purchase_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Purchase {purchase_id} not found")))
    }

    async fn run(
        mut tx: Box<dyn LedgerTransaction>,
        user_id: UserId,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<PurchaseRecord, PurchaseError> {
        match Self::apply(tx.as_mut(), user_id, item_id, quantity).await {
            Ok(record) => {
                tx.commit()
                    .await
                    .map_err(|e| PurchaseError::TransactionAborted(e.message))?;
                Ok(record)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Failed to roll back purchase");
                }
                Err(e)
            }
        }
    }

    async fn apply(
        tx: &mut dyn LedgerTransaction,
        user_id: UserId,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<PurchaseRecord, PurchaseError> {
        tx.find_user(user_id)
            .await?
            .ok_or(PurchaseError::UserNotFound(user_id))?;

        let mut item = tx
            .lock_item(item_id)
            .await?
            .ok_or(PurchaseError::ItemNotFound(item_id))?;

        if !item.can_supply(quantity) {
            return Err(PurchaseError::InsufficientStock {
                item_id,
                available: item.quantity,
                requested: quantity,
            });
        }

        let total_price = item.price.checked_mul(quantity).ok_or_else(|| {
            PurchaseError::Invalid(format!(
                "total price of {quantity} x {} overflows",
                item.price
            ))
        })?;

        item.quantity -= quantity;
        tx.update_item(&item).await?;

        let written = NewPurchase {
            user_id,
            item_id,
            price: item.price,
            quantity,
            total_price,
        };
        let purchase = tx.insert_purchase(&written).await?;

        let record = tx
            .find_purchase_record(user_id, purchase.id)
            .await?
            .ok_or(PurchaseError::ValidationMismatch(purchase.id))?;
        if record.id != purchase.id || !written.matches(&record.purchase()) {
            return Err(PurchaseError::ValidationMismatch(purchase.id));
        }

        Ok(record)
    }
}
