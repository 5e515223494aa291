//! Item entity model and owner-facing inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use freemarket_core::types::{ItemId, UserId};

/// An item listed for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Item {
    /// Unique item identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Unit price. Always positive.
    pub price: i64,
    /// Free-form description.
    pub description: String,
    /// Owner-maintained listing flag; not updated by purchases.
    ///
    /// An owner may mark an item sold out while units remain, to stop
    /// selling without deleting it. Whenever the quantity is set
    /// explicitly the flag is recomputed as `quantity == 0`, overriding
    /// any toggle sent in the same update.
    pub sold_out: bool,
    /// Units in stock. Never negative.
    pub quantity: i64,
    /// The listing owner.
    pub user_id: UserId,
    /// When the item was listed.
    pub created_at: DateTime<Utc>,
    /// When the item was last changed.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp.
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Check whether the item was soft-deleted by its owner.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check whether `user_id` owns this listing.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Check whether the stock can cover `requested` units.
    ///
    /// The policy is strict: a purchase may not take the entire remaining
    /// stock, so `quantity` must be greater than `requested`.
    pub fn can_supply(&self, requested: i64) -> bool {
        self.quantity > requested
    }

    /// Apply owner changes. An explicit quantity recomputes `sold_out`;
    /// otherwise a `sold_out` toggle is taken as given.
    pub fn apply(&mut self, changes: &UpdateItem) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        match (changes.quantity, changes.sold_out) {
            (Some(quantity), _) => {
                self.quantity = quantity;
                self.sold_out = quantity == 0;
            }
            (None, Some(sold_out)) => self.sold_out = sold_out,
            (None, None) => {}
        }
    }
}

/// Data required to list a new item.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateItem {
    /// Display name.
    #[validate(length(min = 3, max = 200))]
    pub name: String,
    /// Unit price.
    #[validate(range(min = 1, max = 100_000_000))]
    pub price: i64,
    /// Description.
    #[validate(length(min = 3, max = 10_000))]
    pub description: String,
    /// Initial stock.
    #[validate(range(min = 1))]
    pub quantity: i64,
}

/// Partial update of an item by its owner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateItem {
    /// New display name.
    #[validate(length(min = 3, max = 200))]
    pub name: Option<String>,
    /// New unit price.
    #[validate(range(min = 1, max = 100_000_000))]
    pub price: Option<i64>,
    /// New description.
    #[validate(length(min = 3, max = 10_000))]
    pub description: Option<String>,
    /// Owner toggle for the sold-out flag. Ignored when `quantity` is also
    /// set, since the flag is then derived from the new stock.
    pub sold_out: Option<bool>,
    /// New stock level.
    #[validate(range(min = 1))]
    pub quantity: Option<i64>,
}
