//! # freemarket-store
//!
//! Shared capacity store implementations for FreeMarket. Supports two modes:
//!
//! - **memory**: In-process store with per-key TTL, for single-node runs and tests
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::StoreManager;
