//! Purchase domain entities.

pub mod model;
pub mod record;

pub use model::{NewPurchase, Purchase, PurchaseRequest};
pub use record::{PurchaseRecord, PurchasedItem, Purchaser};
