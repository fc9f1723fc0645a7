//! Application result alias.

use crate::error::AppError;

/// Standard result type used across all Tavle crates.
pub type AppResult<T> = Result<T, AppError>;
