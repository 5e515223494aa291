//! Purchase entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use freemarket_core::types::{ItemId, PurchaseId, UserId};

/// A committed sale. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    /// Unique purchase identifier.
    pub id: PurchaseId,
    /// Buyer.
    pub user_id: UserId,
    /// Item bought.
    pub item_id: ItemId,
    /// Unit price captured at purchase time.
    pub price: i64,
    /// Units bought.
    pub quantity: i64,
    /// `price * quantity` as of purchase time.
    pub total_price: i64,
    /// When the purchase was recorded.
    pub created_at: DateTime<Utc>,
    /// Equal to `created_at`; purchases are never updated.
    pub updated_at: DateTime<Utc>,
}

/// Row about to be inserted by the purchase unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    /// Buyer.
    pub user_id: UserId,
    /// Item bought.
    pub item_id: ItemId,
    /// Price snapshot.
    pub price: i64,
    /// Units bought.
    pub quantity: i64,
    /// Price snapshot times quantity.
    pub total_price: i64,
}

impl NewPurchase {
    /// Check that a stored row carries exactly the values that were written.
    pub fn matches(&self, stored: &Purchase) -> bool {
        stored.user_id == self.user_id
            && stored.item_id == self.item_id
            && stored.price == self.price
            && stored.quantity == self.quantity
            && stored.total_price == self.total_price
    }
}

/// Purchase input as bound from a request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PurchaseRequest {
    /// Item to buy.
    #[validate(range(min = 1))]
    pub item_id: i64,
    /// Units to buy.
    #[validate(range(min = 1))]
    pub quantity: i64,
}
