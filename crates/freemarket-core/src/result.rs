//! Convenience result type alias for FreeMarket.

use crate::error::AppError;

/// A specialized `Result` type for FreeMarket operations.
pub type AppResult<T> = Result<T, AppError>;
