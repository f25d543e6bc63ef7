//! Convenience result type alias for NasBox.

use crate::error::AppError;

/// A specialized `Result` type for NasBox operations.
pub type AppResult<T> = Result<T, AppError>;
