//! Core type definitions used across the FreeMarket workspace.

pub mod id;

pub use id::*;
