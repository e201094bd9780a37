//! Backend selection.

use crate::error::PersistenceResult;
use crate::memory::InMemoryStore;
use crate::repository::{
    AssetDirectory, SettlementRepository, StoredRow, TradeDateQuery, TradeDateRepository,
    VolumeOiRepository,
};
use crate::sqlite::SqliteStore;
use chrono::{DateTime, Utc};
use cme_core::{Asset, AssetId, AssetName, Settlement, TradeDate, VolumeOi};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Which backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local tables; nothing survives the run.
    Memory,
    #[default]
    Sqlite,
}

/// Store configuration (`[store]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    /// Database file for the SQLite backend.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("data/market_data.sqlite")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

/// The persistence boundary, fixed to one backend at construction.
pub enum MarketDataStore {
    InMemory(InMemoryStore),
    Sqlite(SqliteStore),
}

impl MarketDataStore {
    pub fn open(config: &StoreConfig) -> PersistenceResult<Self> {
        match config.kind {
            StoreKind::Memory => {
                info!("Using in-memory store");
                Ok(Self::InMemory(InMemoryStore::new()))
            }
            StoreKind::Sqlite => Ok(Self::Sqlite(SqliteStore::open(&config.sqlite_path)?)),
        }
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            Self::InMemory(_) => StoreKind::Memory,
            Self::Sqlite(_) => StoreKind::Sqlite,
        }
    }
}

macro_rules! delegate {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            MarketDataStore::InMemory($store) => $call,
            MarketDataStore::Sqlite($store) => $call,
        }
    };
}

impl AssetDirectory for MarketDataStore {
    fn asset_id(&self, name: &AssetName) -> PersistenceResult<Option<AssetId>> {
        delegate!(self, s => s.asset_id(name))
    }

    fn register_asset(&self, name: &AssetName) -> PersistenceResult<AssetId> {
        delegate!(self, s => s.register_asset(name))
    }

    fn remove_asset(&self, name: &AssetName) -> PersistenceResult<bool> {
        delegate!(self, s => s.remove_asset(name))
    }

    fn assets(&self) -> PersistenceResult<Vec<Asset>> {
        delegate!(self, s => s.assets())
    }
}

impl SettlementRepository for MarketDataStore {
    fn create_settlement(&self, entity: &Settlement) -> PersistenceResult<StoredRow<Settlement>> {
        delegate!(self, s => s.create_settlement(entity))
    }

    fn update_settlement(&self, entity: &Settlement) -> PersistenceResult<StoredRow<Settlement>> {
        delegate!(self, s => s.update_settlement(entity))
    }

    fn settlement_last_updated(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Option<DateTime<Utc>>> {
        delegate!(self, s => s.settlement_last_updated(asset_id, trade_date))
    }

    fn settlements(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Vec<StoredRow<Settlement>>> {
        delegate!(self, s => s.settlements(asset_id, trade_date))
    }
}

impl VolumeOiRepository for MarketDataStore {
    fn create_volume_oi(&self, entity: &VolumeOi) -> PersistenceResult<StoredRow<VolumeOi>> {
        delegate!(self, s => s.create_volume_oi(entity))
    }

    fn update_volume_oi(&self, entity: &VolumeOi) -> PersistenceResult<StoredRow<VolumeOi>> {
        delegate!(self, s => s.update_volume_oi(entity))
    }

    fn volume_oi_is_final(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Option<bool>> {
        delegate!(self, s => s.volume_oi_is_final(asset_id, trade_date))
    }

    fn finalize_volume_oi(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<usize> {
        delegate!(self, s => s.finalize_volume_oi(asset_id, trade_date))
    }

    fn volume_oi(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Vec<StoredRow<VolumeOi>>> {
        delegate!(self, s => s.volume_oi(asset_id, trade_date))
    }
}

impl TradeDateRepository for MarketDataStore {
    fn trade_dates(
        &self,
        asset_id: AssetId,
        query: &TradeDateQuery,
    ) -> PersistenceResult<Vec<TradeDate>> {
        delegate!(self, s => s.trade_dates(asset_id, query))
    }
}
