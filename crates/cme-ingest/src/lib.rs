//! Nightly CME market data ingestion.
//!
//! Wires the pieces of one run together:
//! - Configuration (store backend, WebDriver, locators, asset URLs)
//! - Freshness reconciliation against the store
//! - Row ingestion with per-row validation
//! - The orchestrator walking every asset and trade date
//! - Read-side views: joined futures curves and trade date listings

pub mod app;
pub mod config;
pub mod error;
pub mod market_data;
pub mod orchestrator;
pub mod reconciler;
pub mod report;
pub mod service;

pub use app::Application;
pub use config::{AppConfig, AssetUrls, TelemetryConfig};
pub use error::{AppError, AppResult, IngestError, IngestResult, QueryError, QueryResult};
pub use market_data::{
    add_settlement_spread, FuturesDataPoint, FuturesDataService, SpreadPoint, TradeDateService,
};
pub use orchestrator::{AssetTarget, ScrapeOrchestrator};
pub use reconciler::FreshnessReconciler;
pub use report::{RunFailure, RunReport};
pub use service::{IngestOutcome, IngestionService};
