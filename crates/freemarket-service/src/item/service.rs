//! Item CRUD service.
//!
//! Updates and deletes take the same row lock as purchases, so they
//! serialize against purchases in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use freemarket_core::config::PurchaseConfig;
use freemarket_core::error::AppError;
use freemarket_core::types::{ItemId, UserId};
use freemarket_database::ledger::{InventoryLedger, LedgerTransaction};
use freemarket_entity::item::{CreateItem, Item, UpdateItem};

/// Manages item listing, updates and soft deletion.
#[derive(Debug, Clone)]
pub struct ItemService {
    /// Inventory ledger.
    ledger: Arc<dyn InventoryLedger>,
    /// Unit of work timeout.
    timeout: Duration,
}

impl ItemService {
    /// Creates a new item service.
    pub fn new(ledger: Arc<dyn InventoryLedger>, config: &PurchaseConfig) -> Self {
        Self {
            ledger,
            timeout: config.timeout(),
        }
    }

    /// Gets a live item by ID.
    pub async fn get(&self, item_id: ItemId) -> Result<Item, AppError> {
        self.ledger
            .find_item(item_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Item {item_id} not found")))
    }

    /// Lists a new item owned by `owner_id`.
    pub async fn create(&self, owner_id: UserId, data: CreateItem) -> Result<Item, AppError> {
        data.validate()?;

        let mut tx = self.ledger.begin(self.timeout).await?;
        if tx.find_user(owner_id).await?.is_none() {
            return Err(AppError::not_found(format!("User {owner_id} not found")));
        }
        let item = tx.insert_item(owner_id, &data).await?;
        tx.commit().await?;

        info!(item_id = %item.id, owner_id = %owner_id, quantity = item.quantity, "Item listed");
        Ok(item)
    }

    /// Applies owner changes to an item.
    pub async fn update(
        &self,
        item_id: ItemId,
        owner_id: UserId,
        changes: UpdateItem,
    ) -> Result<Item, AppError> {
        changes.validate()?;

        let mut tx = self.ledger.begin(self.timeout).await?;
        let mut item = Self::lock_owned(tx.as_mut(), item_id, owner_id).await?;
        item.apply(&changes);
        tx.update_item(&item).await?;
        tx.commit().await?;

        info!(item_id = %item_id, owner_id = %owner_id, "Item updated");
        Ok(item)
    }

    /// Soft-deletes an item.
    pub async fn delete(&self, item_id: ItemId, owner_id: UserId) -> Result<(), AppError> {
        let mut tx = self.ledger.begin(self.timeout).await?;
        let mut item = Self::lock_owned(tx.as_mut(), item_id, owner_id).await?;
        item.deleted_at = Some(Utc::now());
        tx.update_item(&item).await?;
        tx.commit().await?;

        info!(item_id = %item_id, owner_id = %owner_id, "Item deleted");
        Ok(())
    }

    async fn lock_owned(
        tx: &mut dyn LedgerTransaction,
        item_id: ItemId,
        owner_id: UserId,
    ) -> Result<Item, AppError> {
        let item = tx
            .lock_item(item_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Item {item_id} not found")))?;
        if !item.is_owned_by(owner_id) {
            return Err(AppError::unauthorized(format!(
                "User {owner_id} does not own item {item_id}"
            )));
        }
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use freemarket_core::error::ErrorKind;

    use crate::ledger::MemoryInventoryLedger;

    fn service() -> (MemoryInventoryLedger, ItemService) {
        let ledger = MemoryInventoryLedger::new();
        let service = ItemService::new(Arc::new(ledger.clone()), &PurchaseConfig::default());
        (ledger, service)
    }

    fn lamp() -> CreateItem {
        CreateItem {
            name: "Lamp".to_string(),
            price: 1200,
            description: "Desk lamp".to_string(),
            quantity: 4,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (ledger, service) = service();
        let owner = ledger.seed_user("owner@example.com");

        let item = service.create(owner.id, lamp()).await.unwrap();
        let fetched = service.get(item.id).await.unwrap();
        assert_eq!(fetched, item);
        assert!(!fetched.sold_out);
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_bounds_input() {
        let (ledger, service) = service();
        let owner = ledger.seed_user("owner@example.com");

        let mut input = lamp();
        input.price = 100_000_001;
        let err = service.create(owner.id, input).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_requires_owner() {
        let (ledger, service) = service();
        let owner = ledger.seed_user("owner@example.com");
        let stranger = ledger.seed_user("stranger@example.com");
        let item = service.create(owner.id, lamp()).await.unwrap();

        let changes = UpdateItem {
            price: Some(900),
            ..Default::default()
        };
        let err = service
            .update(item.id, stranger.id, changes.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let updated = service.update(item.id, owner.id, changes).await.unwrap();
        assert_eq!(updated.price, 900);
        assert_eq!(ledger.item(item.id).unwrap().price, 900);
    }

    #[tokio::test]
    async fn test_delete_hides_item() {
        let (ledger, service) = service();
        let owner = ledger.seed_user("owner@example.com");
        let item = service.create(owner.id, lamp()).await.unwrap();

        service.delete(item.id, owner.id).await.unwrap();

        let err = service.get(item.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(ledger.item(item.id).unwrap().is_deleted());
    }
}
