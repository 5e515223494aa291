//! Purchase failure taxonomy.

use thiserror::Error;

use freemarket_core::error::{AppError, ErrorKind};
use freemarket_core::types::{ItemId, PurchaseId, UserId};

/// Why a purchase produced no state change.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// The buyer does not exist.
    #[error("user {0} not found")]
    UserNotFound(UserId),
    /// The item does not exist or was deleted by its owner.
    #[error("item {0} not found")]
    ItemNotFound(ItemId),
    /// The stock cannot cover the request.
    #[error("insufficient stock for item {item_id}: {available} available, {requested} requested")]
    InsufficientStock {
        /// Item that was asked for.
        item_id: ItemId,
        /// Stock read under the row lock.
        available: i64,
        /// Units requested.
        requested: i64,
    },
    /// The purchase read back differs from the one written.
    #[error("purchase {0} read back with different values")]
    ValidationMismatch(PurchaseId),
    /// The unit of work timed out or could not commit.
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),
    /// The request itself is malformed.
    #[error("invalid purchase: {0}")]
    Invalid(String),
    /// Any other ledger failure.
    #[error(transparent)]
    Store(AppError),
}

impl PurchaseError {
    /// The application error kind this failure maps to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) | Self::ItemNotFound(_) => ErrorKind::NotFound,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::ValidationMismatch(_) => ErrorKind::ValidationMismatch,
            Self::TransactionAborted(_) => ErrorKind::TransactionAborted,
            Self::Invalid(_) => ErrorKind::Validation,
            Self::Store(e) => e.kind,
        }
    }
}

impl From<AppError> for PurchaseError {
    fn from(e: AppError) -> Self {
        match e.kind {
            ErrorKind::TransactionAborted => Self::TransactionAborted(e.message),
            _ => Self::Store(e),
        }
    }
}

impl From<PurchaseError> for AppError {
    fn from(e: PurchaseError) -> Self {
        match e {
            PurchaseError::Store(inner) => inner,
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}
