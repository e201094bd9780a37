//! Application error types.

use cme_persistence::PersistenceError;
use thiserror::Error;

/// Failure of one ingestion unit (one asset, one trade date, one table).
#[derive(Debug, Error)]
pub enum IngestError {
    /// A write failed. Rows written before it stay committed.
    #[error("Persistence failure after {committed} committed row(s): {source}")]
    Persistence {
        committed: usize,
        #[source]
        source: PersistenceError,
    },
}

impl IngestError {
    pub fn committed(&self) -> usize {
        match self {
            IngestError::Persistence { committed, .. } => *committed,
        }
    }
}

/// Failure of a read-side query over stored market data.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Spreads need at least one contract month.
    #[error("No futures data to compute spreads from")]
    EmptyCurve,

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] cme_core::CoreError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Scrape error: {0}")]
    Scrape(#[from] cme_scraper::ScrapeError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] cme_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether the error ended the browser session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Scrape(e) if e.is_fatal())
    }
}

pub type AppResult<T> = Result<T, AppError>;
pub type IngestResult<T> = Result<T, IngestError>;
pub type QueryResult<T> = Result<T, QueryError>;
