//! Inventory-safe purchase transaction.

pub mod error;
pub mod orchestrator;

pub use error::PurchaseError;
pub use orchestrator::PurchaseOrchestrator;
