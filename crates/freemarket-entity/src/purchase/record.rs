//! Rendered purchase view returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use freemarket_core::types::{ItemId, PurchaseId, UserId};

use super::model::Purchase;
use crate::item::Item;

/// A purchase together with its buyer and item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Purchase ID.
    pub id: PurchaseId,
    /// Buyer ID.
    pub user_id: UserId,
    /// Item ID.
    pub item_id: ItemId,
    /// Unit price snapshot.
    pub price: i64,
    /// Units bought.
    pub quantity: i64,
    /// Total charged.
    pub total_price: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Update time.
    pub updated_at: DateTime<Utc>,
    /// Buyer view.
    pub user: Purchaser,
    /// Item view, as of the moment the record was read.
    pub item: PurchasedItem,
}

/// Buyer reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchaser {
    /// Buyer ID.
    pub id: UserId,
}

/// Item reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasedItem {
    /// Item ID.
    pub id: ItemId,
    /// Item name.
    pub name: String,
    /// Current listed price.
    pub price: i64,
    /// Item description.
    pub description: String,
    /// Current stock.
    pub quantity: i64,
}

impl PurchaseRecord {
    /// Render a purchase with its item.
    pub fn new(purchase: Purchase, item: &Item) -> Self {
        Self {
            id: purchase.id,
            user_id: purchase.user_id,
            item_id: purchase.item_id,
            price: purchase.price,
            quantity: purchase.quantity,
            total_price: purchase.total_price,
            created_at: purchase.created_at,
            updated_at: purchase.updated_at,
            user: Purchaser {
                id: purchase.user_id,
            },
            item: PurchasedItem {
                id: item.id,
                name: item.name.clone(),
                price: item.price,
                description: item.description.clone(),
                quantity: item.quantity,
            },
        }
    }

    /// The bare purchase row behind this record.
    pub fn purchase(&self) -> Purchase {
        Purchase {
            id: self.id,
            user_id: self.user_id,
            item_id: self.item_id,
            price: self.price,
            quantity: self.quantity,
            total_price: self.total_price,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
