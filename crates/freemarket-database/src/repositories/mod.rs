//! Repository implementations for all FreeMarket entities.
//!
//! Queries that must run inside a unit of work take a `&mut PgConnection`
//! (a transaction derefs to one); the rest run on the pool.

pub mod item;
pub mod purchase;
pub mod user;

pub use item::ItemRepository;
pub use purchase::PurchaseRepository;
pub use user::UserRepository;

use freemarket_core::error::{AppError, ErrorKind};

/// SQLSTATE codes that mean the unit of work was cancelled rather than
/// malformed: statement timeout, lock timeout, serialization failure and
/// deadlock.
const ABORT_CODES: [&str; 4] = ["57014", "55P03", "40001", "40P01"];

/// Map a sqlx error, classifying cancellation as an aborted transaction.
pub(crate) fn db_err(context: &str, e: sqlx::Error) -> AppError {
    let aborted = e
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| ABORT_CODES.iter().any(|abort| code == *abort));

    let kind = if aborted {
        ErrorKind::TransactionAborted
    } else {
        ErrorKind::Database
    };

    AppError::with_source(kind, format!("{context}: {e}"), e)
}
