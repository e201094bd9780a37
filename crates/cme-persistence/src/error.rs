//! Persistence error types.

use cme_core::{AssetId, CoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Uniqueness violation on (asset, trade date, contract month) or asset name.
    #[error("Persistence conflict: {0}")]
    Conflict(String),

    /// Backend could not serve the request (I/O, locking, closed connection).
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    /// The stored volume/OI row is final and cannot be overwritten.
    #[error("Row already final: {0}")]
    Finalized(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    /// A stored row no longer satisfies entity invariants.
    #[error("Corrupt stored row: {0}")]
    Corrupt(#[from] CoreError),
}

impl PersistenceError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, PersistenceError::Conflict(_))
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                PersistenceError::Conflict(e.to_string())
            }
            rusqlite::Error::QueryReturnedNoRows => PersistenceError::NotFound(e.to_string()),
            _ => PersistenceError::Unavailable(e.to_string()),
        }
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
