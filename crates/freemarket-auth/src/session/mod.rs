//! Session admission against the shared capacity store.

pub mod admission;
pub mod limit;
pub mod registry;
pub mod sweeper;

pub use admission::{AdmissionResult, SessionAdmissionController};
pub use limit::SessionLimitControl;
pub use registry::SessionRegistry;
pub use sweeper::{SessionSweeper, SweepHandle};
