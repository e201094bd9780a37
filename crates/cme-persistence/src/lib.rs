//! Persistence boundary for CME market data.
//!
//! Repositories are expressed as traits so that the ingestion pipeline can
//! run against either backend:
//! - [`InMemoryStore`]: process-local tables for dry runs and tests
//! - [`SqliteStore`]: relational store with uniqueness and cascade rules
//!
//! [`MarketDataStore`] picks one of them once, at construction.

pub mod error;
pub mod memory;
pub mod repository;
pub mod sqlite;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use memory::InMemoryStore;
pub use repository::{
    AssetDirectory, MarketDataRepository, SettlementRepository, StoredRow, TradeDateQuery,
    TradeDateRepository, VolumeOiRepository,
};
pub use sqlite::SqliteStore;
pub use store::{MarketDataStore, StoreConfig, StoreKind};
