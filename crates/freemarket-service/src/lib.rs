//! # freemarket-service
//!
//! Business logic service layer for FreeMarket. The purchase orchestrator
//! and the item service run their work inside inventory-ledger units of
//! work; both receive the ledger at construction time as an `Arc`.

pub mod item;
pub mod ledger;
pub mod purchase;

pub use item::ItemService;
pub use ledger::MemoryInventoryLedger;
pub use purchase::{PurchaseError, PurchaseOrchestrator};
