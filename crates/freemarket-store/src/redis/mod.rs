//! Redis capacity store.

pub mod client;
pub mod operations;
mod scripts;

pub use client::RedisClient;
pub use operations::RedisCapacityStore;
