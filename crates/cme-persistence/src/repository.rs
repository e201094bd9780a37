//! Repository traits consumed by the ingestion pipeline.

use crate::error::PersistenceResult;
use chrono::{DateTime, Utc};
use cme_core::{Asset, AssetId, AssetName, Settlement, TradeDate, VolumeOi};
use serde::Serialize;

/// An entity together with its surrogate row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRow<T> {
    pub id: i64,
    pub entity: T,
}

/// Asset name to id resolution.
pub trait AssetDirectory {
    fn asset_id(&self, name: &AssetName) -> PersistenceResult<Option<AssetId>>;

    /// Register a name, returning the existing id when already present.
    fn register_asset(&self, name: &AssetName) -> PersistenceResult<AssetId>;

    /// Remove an asset and, by cascade, all of its market data.
    /// Returns `false` when the name is unknown.
    fn remove_asset(&self, name: &AssetName) -> PersistenceResult<bool>;

    fn assets(&self) -> PersistenceResult<Vec<Asset>>;
}

pub trait SettlementRepository {
    /// Insert a new row. Fails with `Conflict` when the
    /// (asset, trade date, month) key exists.
    fn create_settlement(&self, entity: &Settlement) -> PersistenceResult<StoredRow<Settlement>>;

    /// Replace the row with the same key. Fails with `NotFound` when absent.
    fn update_settlement(&self, entity: &Settlement) -> PersistenceResult<StoredRow<Settlement>>;

    /// Latest `last_updated` among the date's rows, `None` when none exist.
    ///
    /// A date is as fresh as its latest publication. Contract months that
    /// dropped out of a republished table keep their older stamp.
    fn settlement_last_updated(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Option<DateTime<Utc>>>;

    /// Stored rows for a date, ordered by contract month.
    fn settlements(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Vec<StoredRow<Settlement>>>;
}

pub trait VolumeOiRepository {
    /// Insert a new row. Fails with `Conflict` when the
    /// (asset, trade date, month) key exists.
    fn create_volume_oi(&self, entity: &VolumeOi) -> PersistenceResult<StoredRow<VolumeOi>>;

    /// Replace the row with the same key. Fails with `NotFound` when absent
    /// and with `Finalized` when the stored row is already final.
    fn update_volume_oi(&self, entity: &VolumeOi) -> PersistenceResult<StoredRow<VolumeOi>>;

    /// `Some(true)` only when every stored row of the date is final.
    fn volume_oi_is_final(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Option<bool>>;

    /// Mark every preliminary row of the date final, returning how many
    /// rows changed.
    fn finalize_volume_oi(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<usize>;

    /// Stored rows for a date, ordered by contract month.
    fn volume_oi(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Vec<StoredRow<VolumeOi>>>;
}

/// Inclusive date bounds and paging for trade date listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeDateQuery {
    pub start: Option<TradeDate>,
    pub end: Option<TradeDate>,
    pub skip: usize,
    pub limit: usize,
}

impl TradeDateQuery {
    pub fn contains(&self, date: TradeDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

impl Default for TradeDateQuery {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            skip: 0,
            limit: 100,
        }
    }
}

pub trait TradeDateRepository {
    /// Distinct trade dates of an asset that have at least one contract
    /// month stored in both tables, ascending.
    fn trade_dates(
        &self,
        asset_id: AssetId,
        query: &TradeDateQuery,
    ) -> PersistenceResult<Vec<TradeDate>>;
}

/// Everything the ingestion pipeline needs from one backend.
pub trait MarketDataRepository: AssetDirectory + SettlementRepository + VolumeOiRepository {}

impl<T> MarketDataRepository for T where
    T: AssetDirectory + SettlementRepository + VolumeOiRepository + ?Sized
{
}
