//! Inventory ledger: the transactional unit of work around item rows.
//!
//! A [`LedgerTransaction`] is opened by [`InventoryLedger::begin`] and ends
//! with either [`LedgerTransaction::commit`] or
//! [`LedgerTransaction::rollback`]. Dropping an open transaction rolls it
//! back. Rows returned by [`LedgerTransaction::lock_item`] stay exclusively
//! locked until the transaction ends.

pub mod postgres;

pub use postgres::{PgInventoryLedger, PgLedgerTransaction};

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use freemarket_core::result::AppResult;
use freemarket_core::types::{ItemId, PurchaseId, UserId};
use freemarket_entity::item::{CreateItem, Item};
use freemarket_entity::purchase::{NewPurchase, Purchase, PurchaseRecord};
use freemarket_entity::user::User;

/// Source of inventory units of work and of committed purchase history.
#[async_trait]
pub trait InventoryLedger: Send + Sync + Debug + 'static {
    /// Open a unit of work whose statements and lock waits are bounded by
    /// `timeout`.
    async fn begin(&self, timeout: Duration) -> AppResult<Box<dyn LedgerTransaction>>;

    /// Read the committed state of a live item without locking it.
    async fn find_item(&self, id: ItemId) -> AppResult<Option<Item>>;

    /// List a user's committed purchases, newest first.
    async fn list_purchases(&self, user_id: UserId) -> AppResult<Vec<PurchaseRecord>>;

    /// Read one of a user's committed purchases.
    async fn find_purchase(
        &self,
        user_id: UserId,
        id: PurchaseId,
    ) -> AppResult<Option<PurchaseRecord>>;
}

/// One open unit of work.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Resolve a user.
    async fn find_user(&mut self, id: UserId) -> AppResult<Option<User>>;

    /// Read a live item and lock it exclusively for the rest of the unit of
    /// work. Waits while another unit of work holds the lock.
    async fn lock_item(&mut self, id: ItemId) -> AppResult<Option<Item>>;

    /// Insert a new item.
    async fn insert_item(&mut self, owner_id: UserId, data: &CreateItem) -> AppResult<Item>;

    /// Write back an item previously returned by `lock_item` or `insert_item`.
    async fn update_item(&mut self, item: &Item) -> AppResult<()>;

    /// Insert a purchase row.
    async fn insert_purchase(&mut self, data: &NewPurchase) -> AppResult<Purchase>;

    /// Read a purchase joined with its item, as seen by this unit of work.
    async fn find_purchase_record(
        &mut self,
        user_id: UserId,
        id: PurchaseId,
    ) -> AppResult<Option<PurchaseRecord>>;

    /// Make every write of this unit of work visible and release its locks.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard every write of this unit of work and release its locks.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
