//! # freemarket-database
//!
//! PostgreSQL connection management, repositories for users, items and
//! purchases, and the transactional inventory ledger used by purchases.

pub mod connection;
pub mod ledger;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use ledger::{InventoryLedger, LedgerTransaction, PgInventoryLedger};
