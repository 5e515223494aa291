//! PostgreSQL-backed inventory ledger.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tracing::debug;

use freemarket_core::error::{AppError, ErrorKind};
use freemarket_core::result::AppResult;
use freemarket_core::types::{ItemId, PurchaseId, UserId};
use freemarket_entity::item::{CreateItem, Item};
use freemarket_entity::purchase::{NewPurchase, Purchase, PurchaseRecord};
use freemarket_entity::user::User;

use super::{InventoryLedger, LedgerTransaction};
use crate::connection::DatabasePool;
use crate::repositories::{ItemRepository, PurchaseRepository, UserRepository, db_err};

/// Inventory ledger over the `items` and `purchases` tables.
#[derive(Debug, Clone)]
pub struct PgInventoryLedger {
    db: DatabasePool,
    items: ItemRepository,
    purchases: PurchaseRepository,
}

impl PgInventoryLedger {
    /// Create a new ledger on the given pool.
    pub fn new(db: DatabasePool) -> Self {
        let items = ItemRepository::new(db.pool().clone());
        let purchases = PurchaseRepository::new(db.pool().clone());
        Self {
            db,
            items,
            purchases,
        }
    }
}

#[async_trait]
impl InventoryLedger for PgInventoryLedger {
    async fn begin(&self, timeout: Duration) -> AppResult<Box<dyn LedgerTransaction>> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| db_err("Failed to begin transaction", e))?;

        let millis = timeout.as_millis().max(1);
        for setting in ["statement_timeout", "lock_timeout"] {
            sqlx::query(&format!("SET LOCAL {setting} = {millis}"))
                .execute(&mut *tx)
                .await
                .map_err(|e| db_err("Failed to set transaction timeout", e))?;
        }

        debug!(timeout_ms = %millis, "Opened inventory transaction");
        Ok(Box::new(PgLedgerTransaction { tx }))
    }

    async fn find_item(&self, id: ItemId) -> AppResult<Option<Item>> {
        self.items.find_by_id(id).await
    }

    async fn list_purchases(&self, user_id: UserId) -> AppResult<Vec<PurchaseRecord>> {
        self.purchases.list_records(user_id).await
    }

    async fn find_purchase(
        &self,
        user_id: UserId,
        id: PurchaseId,
    ) -> AppResult<Option<PurchaseRecord>> {
        self.purchases.find_record(user_id, id).await
    }
}

/// An open PostgreSQL transaction. Dropping it rolls back.
#[derive(Debug)]
pub struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn find_user(&mut self, id: UserId) -> AppResult<Option<User>> {
        UserRepository::find_in(&mut self.tx, id).await
    }

    async fn lock_item(&mut self, id: ItemId) -> AppResult<Option<Item>> {
        ItemRepository::lock_for_update(&mut self.tx, id).await
    }

    async fn insert_item(&mut self, owner_id: UserId, data: &CreateItem) -> AppResult<Item> {
        ItemRepository::insert(&mut self.tx, owner_id, data).await
    }

    async fn update_item(&mut self, item: &Item) -> AppResult<()> {
        let affected = ItemRepository::write_back(&mut self.tx, item).await?;
        if affected != 1 {
            return Err(AppError::not_found(format!("Item {} not found", item.id)));
        }
        Ok(())
    }

    async fn insert_purchase(&mut self, data: &NewPurchase) -> AppResult<Purchase> {
        PurchaseRepository::insert(&mut self.tx, data).await
    }

    async fn find_purchase_record(
        &mut self,
        user_id: UserId,
        id: PurchaseId,
    ) -> AppResult<Option<PurchaseRecord>> {
        PurchaseRepository::find_record_in(&mut self.tx, user_id, id).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::TransactionAborted,
                format!("Failed to commit transaction: {e}"),
                e,
            )
        })
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| db_err("Failed to roll back transaction", e))
    }
}
