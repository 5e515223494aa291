//! # freemarket-entity
//!
//! Domain entity models for FreeMarket. Every struct in this crate
//! represents a database table row, an input accepted by a service, or a
//! rendered view. Database entities derive `sqlx::FromRow`.

pub mod item;
pub mod purchase;
pub mod user;
