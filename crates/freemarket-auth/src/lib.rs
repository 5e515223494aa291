//! # freemarket-auth
//!
//! Session admission for FreeMarket. Authentication itself (password
//! hashing, token issuance) happens upstream; this crate only decides
//! whether an authenticated session token may be active.
//!
//! ## Modules
//!
//! - `session`: admission controller, registry inspection, limit
//!   administration and the background reconciliation sweep

pub mod session;

pub use session::{
    AdmissionResult, SessionAdmissionController, SessionLimitControl, SessionRegistry,
    SessionSweeper, SweepHandle,
};
