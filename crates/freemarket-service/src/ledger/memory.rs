//! In-memory inventory ledger.
//!
//! Each item row has its own async mutex. A unit of work holds the owned
//! guard of every row it locked and stages its writes; commit publishes the
//! staged rows and purchases before the guards are released, so lock
//! holders always observe the latest committed row. Commits publish under
//! the write side of `publish` and readers hold its read side, so nobody
//! sees a decremented stock without the purchase that caused it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use freemarket_core::error::AppError;
use freemarket_core::result::AppResult;
use freemarket_core::types::{ItemId, PurchaseId, UserId};
use freemarket_database::ledger::{InventoryLedger, LedgerTransaction};
use freemarket_entity::item::{CreateItem, Item};
use freemarket_entity::purchase::{NewPurchase, Purchase, PurchaseRecord};
use freemarket_entity::user::User;

/// Committed state shared by every unit of work.
#[derive(Debug, Default)]
struct Tables {
    users: DashMap<UserId, User>,
    items: DashMap<ItemId, Item>,
    row_locks: DashMap<ItemId, Arc<Mutex<()>>>,
    purchases: DashMap<PurchaseId, Purchase>,
    next_user_id: AtomicI64,
    next_item_id: AtomicI64,
    next_purchase_id: AtomicI64,
    failing_commits: AtomicUsize,
    publish: RwLock<()>,
}

impl Tables {
    fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.publish.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_lock(&self, id: ItemId) -> Arc<Mutex<()>> {
        Arc::clone(self.row_locks.entry(id).or_default().value())
    }

    fn render(&self, purchase: Purchase) -> Option<PurchaseRecord> {
        let item = self.items.get(&purchase.item_id)?;
        Some(PurchaseRecord::new(purchase, item.value()))
    }
}

/// Inventory ledger keeping users, items and purchases in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryInventoryLedger {
    tables: Arc<Tables>,
}

impl MemoryInventoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user.
    pub fn seed_user(&self, email: &str) -> User {
        let id = UserId(self.tables.next_user_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = Utc::now();
        let user = User {
            id,
            email: email.to_string(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.tables.users.insert(id, user.clone());
        user
    }

    /// Add an item without input validation.
    pub fn seed_item(&self, owner_id: UserId, data: &CreateItem) -> Item {
        let item = new_item(&self.tables, owner_id, data);
        self.tables.row_lock(item.id);
        self.tables.items.insert(item.id, item.clone());
        item
    }

    /// Read the committed state of an item, deleted or not.
    pub fn item(&self, id: ItemId) -> Option<Item> {
        let _published = self.tables.read();
        self.tables.items.get(&id).map(|r| r.value().clone())
    }

    /// Number of committed purchases.
    pub fn purchase_count(&self) -> usize {
        let _published = self.tables.read();
        self.tables.purchases.len()
    }

    /// Number of committed purchases of one item.
    pub fn purchase_count_for(&self, item_id: ItemId) -> usize {
        let _published = self.tables.read();
        self.tables
            .purchases
            .iter()
            .filter(|p| p.item_id == item_id)
            .count()
    }

    /// Make the next `n` commits fail as if the database had aborted them.
    pub fn fail_next_commits(&self, n: usize) {
        self.tables.failing_commits.store(n, Ordering::SeqCst);
    }
}

fn new_item(tables: &Tables, owner_id: UserId, data: &CreateItem) -> Item {
    let id = ItemId(tables.next_item_id.fetch_add(1, Ordering::SeqCst) + 1);
    let now = Utc::now();
    Item {
        id,
        name: data.name.clone(),
        price: data.price,
        description: data.description.clone(),
        sold_out: false,
        quantity: data.quantity,
        user_id: owner_id,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

#[async_trait]
impl InventoryLedger for MemoryInventoryLedger {
    async fn begin(&self, _timeout: Duration) -> AppResult<Box<dyn LedgerTransaction>> {
        Ok(Box::new(MemoryLedgerTransaction {
            tables: Arc::clone(&self.tables),
            guards: HashMap::new(),
            working: HashMap::new(),
            written: HashMap::new(),
            purchases: Vec::new(),
        }))
    }

    async fn find_item(&self, id: ItemId) -> AppResult<Option<Item>> {
        Ok(self.item(id).filter(|item| !item.is_deleted()))
    }

    async fn list_purchases(&self, user_id: UserId) -> AppResult<Vec<PurchaseRecord>> {
        let _published = self.tables.read();
        let mut purchases: Vec<Purchase> = self
            .tables
            .purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.value().clone())
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(purchases
            .into_iter()
            .filter_map(|p| self.tables.render(p))
            .collect())
    }

    async fn find_purchase(
        &self,
        user_id: UserId,
        id: PurchaseId,
    ) -> AppResult<Option<PurchaseRecord>> {
        let _published = self.tables.read();
        let purchase = self
            .tables
            .purchases
            .get(&id)
            .map(|p| p.value().clone())
            .filter(|p| p.user_id == user_id);
        Ok(purchase.and_then(|p| self.tables.render(p)))
    }
}

/// An open in-memory unit of work. Dropping it discards staged writes and
/// releases its row locks.
#[derive(Debug)]
pub struct MemoryLedgerTransaction {
    tables: Arc<Tables>,
    guards: HashMap<ItemId, OwnedMutexGuard<()>>,
    working: HashMap<ItemId, Item>,
    written: HashMap<ItemId, Item>,
    purchases: Vec<Purchase>,
}

#[async_trait]
impl LedgerTransaction for MemoryLedgerTransaction {
    async fn find_user(&mut self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.tables.users.get(&id).map(|u| u.value().clone()))
    }

    async fn lock_item(&mut self, id: ItemId) -> AppResult<Option<Item>> {
        if let Some(item) = self.working.get(&id) {
            return Ok(Some(item.clone()).filter(|item| !item.is_deleted()));
        }
        if !self.tables.items.contains_key(&id) {
            return Ok(None);
        }

        let guard = self.tables.row_lock(id).lock_owned().await;
        let Some(item) = self.tables.items.get(&id).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        if item.is_deleted() {
            return Ok(None);
        }

        debug!(item_id = %id, "Item row locked");
        self.guards.insert(id, guard);
        self.working.insert(id, item.clone());
        Ok(Some(item))
    }

    async fn insert_item(&mut self, owner_id: UserId, data: &CreateItem) -> AppResult<Item> {
        let item = new_item(&self.tables, owner_id, data);
        self.working.insert(item.id, item.clone());
        self.written.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_item(&mut self, item: &Item) -> AppResult<()> {
        if !self.working.contains_key(&item.id) {
            return Err(AppError::internal(format!(
                "Item {} is not locked by this transaction",
                item.id
            )));
        }
        let mut row = item.clone();
        row.updated_at = Utc::now();
        self.working.insert(row.id, row.clone());
        self.written.insert(row.id, row);
        Ok(())
    }

    async fn insert_purchase(&mut self, data: &NewPurchase) -> AppResult<Purchase> {
        let id = PurchaseId(self.tables.next_purchase_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = Utc::now();
        let purchase = Purchase {
            id,
            user_id: data.user_id,
            item_id: data.item_id,
            price: data.price,
            quantity: data.quantity,
            total_price: data.total_price,
            created_at: now,
            updated_at: now,
        };
        self.purchases.push(purchase.clone());
        Ok(purchase)
    }

    async fn find_purchase_record(
        &mut self,
        user_id: UserId,
        id: PurchaseId,
    ) -> AppResult<Option<PurchaseRecord>> {
        let staged = self.purchases.iter().find(|p| p.id == id).cloned();
        let purchase = staged
            .or_else(|| self.tables.purchases.get(&id).map(|p| p.value().clone()))
            .filter(|p| p.user_id == user_id);
        let Some(purchase) = purchase else {
            return Ok(None);
        };

        let item = match self.working.get(&purchase.item_id) {
            Some(item) => Some(item.clone()),
            None => self
                .tables
                .items
                .get(&purchase.item_id)
                .map(|r| r.value().clone()),
        };
        Ok(item.map(|item| PurchaseRecord::new(purchase, &item)))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let injected = self
            .tables
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AppError::transaction_aborted(
                "Commit rejected by the ledger",
            ));
        }

        let this = *self;
        {
            let _publishing = this
                .tables
                .publish
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            for (id, item) in this.written {
                this.tables.row_lock(id);
                this.tables.items.insert(id, item);
            }
            for purchase in this.purchases {
                this.tables.purchases.insert(purchase.id, purchase);
            }
        }
        drop(this.guards);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
