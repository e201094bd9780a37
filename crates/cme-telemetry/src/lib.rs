//! Prometheus metrics and structured logging for CME ingestion.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Counters for rows written/rejected, date outcomes, element lookups
//! - Node-exporter textfile output, since a batch run has no scrape endpoint

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
