//! Core traits defined in `freemarket-core` and implemented by other crates.

pub mod capacity_store;

pub use capacity_store::{AdmitOutcome, AdmitRequest, CapacityStore, parse_limit};
