//! In-process capacity store.

pub mod store;

pub use store::MemoryCapacityStore;
