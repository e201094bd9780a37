//! Error types for cme-core.

use thiserror::Error;

/// Core error types.
///
/// Every parsing variant carries the offending literal so that a rejected
/// row can be diagnosed from the log alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid price format: '{0}'")]
    InvalidPriceFormat(String),

    #[error("Invalid integer format: '{0}'")]
    InvalidIntegerFormat(String),

    #[error("Invalid trade date format: '{0}'")]
    InvalidDateFormat(String),

    #[error("Invalid contract month format: '{0}'")]
    InvalidMonthFormat(String),

    #[error("Invalid timestamp format: '{0}'")]
    InvalidTimestampFormat(String),

    #[error("Invalid asset name: '{0}'")]
    InvalidAssetName(String),

    #[error("Entity validation failed on {field}: {reason}")]
    EntityValidation { field: &'static str, reason: String },
}

impl CoreError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::EntityValidation {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
