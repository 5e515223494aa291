//! Inventory ledger implementations living above the database crate.

pub mod memory;

pub use memory::{MemoryInventoryLedger, MemoryLedgerTransaction};
