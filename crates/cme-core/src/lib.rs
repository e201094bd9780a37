//! Core domain types for CME settlement and volume/open-interest ingestion.
//!
//! This crate provides:
//! - The exchange price notation (handles, 32nds, comma grouping, A/B suffixes)
//! - Calendar value objects for trade dates, contract months and page timestamps
//! - The raw table schema shared with the scraper
//! - Validated, immutable market data entities
//! - Freshness rules deciding whether a stored row must be rewritten

pub mod asset;
pub mod error;
mod fields;
pub mod freshness;
pub mod price;
pub mod schema;
pub mod settlement;
pub mod timestamp;
pub mod trade_date;
pub mod volume_oi;
pub mod year_month;

pub use asset::{Asset, AssetId, AssetName};
pub use error::{CoreError, CoreResult};
pub use freshness::{FreshnessAction, FreshnessSignal, FreshnessState};
pub use price::{parse_grouped_int, parse_price, validate_price, PriceLiteral};
pub use schema::{RawRow, TableKind, SETTLEMENT_COLUMNS, VOLUME_OI_COLUMNS};
pub use settlement::{Settlement, SettlementRecord};
pub use timestamp::{chicago_to_utc, parse_last_updated, truncate_to_millis};
pub use trade_date::TradeDate;
pub use volume_oi::{VolumeOi, VolumeOiRecord};
pub use year_month::YearMonth;
