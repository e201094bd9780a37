//! Process-local store.

use crate::error::{PersistenceError, PersistenceResult};
use crate::repository::{
    AssetDirectory, SettlementRepository, StoredRow, TradeDateQuery, TradeDateRepository,
    VolumeOiRepository,
};
use chrono::{DateTime, Utc};
use cme_core::{Asset, AssetId, AssetName, Settlement, TradeDate, VolumeOi, YearMonth};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

type RowKey = (AssetId, TradeDate, YearMonth);

#[derive(Default)]
struct Tables {
    assets: BTreeMap<AssetId, AssetName>,
    settlements: BTreeMap<RowKey, StoredRow<Settlement>>,
    volume_oi: BTreeMap<RowKey, StoredRow<VolumeOi>>,
    next_asset_id: i64,
    next_row_id: i64,
}

impl Tables {
    fn require_asset(&self, id: AssetId) -> PersistenceResult<()> {
        if self.assets.contains_key(&id) {
            Ok(())
        } else {
            Err(PersistenceError::AssetNotFound(id))
        }
    }

    fn allocate_row_id(&mut self) -> i64 {
        self.next_row_id += 1;
        self.next_row_id
    }
}

/// In-memory store with the same key and cascade rules as the SQLite store.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn date_range<T>(
    rows: &BTreeMap<RowKey, T>,
    asset_id: AssetId,
    trade_date: TradeDate,
) -> impl Iterator<Item = &T> {
    rows.iter()
        .filter(move |((a, d, _), _)| *a == asset_id && *d == trade_date)
        .map(|(_, row)| row)
}

impl AssetDirectory for InMemoryStore {
    fn asset_id(&self, name: &AssetName) -> PersistenceResult<Option<AssetId>> {
        let tables = self.tables.lock();
        Ok(tables
            .assets
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(id, _)| *id))
    }

    fn register_asset(&self, name: &AssetName) -> PersistenceResult<AssetId> {
        let mut tables = self.tables.lock();
        if let Some((id, _)) = tables.assets.iter().find(|(_, n)| *n == name) {
            return Ok(*id);
        }
        tables.next_asset_id += 1;
        let id = AssetId(tables.next_asset_id);
        tables.assets.insert(id, name.clone());
        debug!(asset = %name, asset_id = %id, "Registered asset");
        Ok(id)
    }

    fn remove_asset(&self, name: &AssetName) -> PersistenceResult<bool> {
        let mut tables = self.tables.lock();
        let Some(id) = tables
            .assets
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(id, _)| *id)
        else {
            return Ok(false);
        };
        tables.assets.remove(&id);
        tables.settlements.retain(|(a, _, _), _| *a != id);
        tables.volume_oi.retain(|(a, _, _), _| *a != id);
        Ok(true)
    }

    fn assets(&self) -> PersistenceResult<Vec<Asset>> {
        let tables = self.tables.lock();
        Ok(tables
            .assets
            .iter()
            .map(|(id, name)| Asset::new(*id, name.clone()))
            .collect())
    }
}

impl SettlementRepository for InMemoryStore {
    fn create_settlement(&self, entity: &Settlement) -> PersistenceResult<StoredRow<Settlement>> {
        let mut tables = self.tables.lock();
        tables.require_asset(entity.asset_id())?;
        let key = (entity.asset_id(), entity.trade_date(), entity.month());
        if tables.settlements.contains_key(&key) {
            return Err(PersistenceError::Conflict(format!(
                "settlement asset={} trade_date={} month={}",
                key.0, key.1, key.2
            )));
        }
        let row = StoredRow {
            id: tables.allocate_row_id(),
            entity: entity.clone(),
        };
        tables.settlements.insert(key, row.clone());
        Ok(row)
    }

    fn update_settlement(&self, entity: &Settlement) -> PersistenceResult<StoredRow<Settlement>> {
        let mut tables = self.tables.lock();
        let key = (entity.asset_id(), entity.trade_date(), entity.month());
        let Some(row) = tables.settlements.get_mut(&key) else {
            return Err(PersistenceError::NotFound(format!(
                "settlement asset={} trade_date={} month={}",
                key.0, key.1, key.2
            )));
        };
        row.entity = entity.clone();
        Ok(row.clone())
    }

    fn settlement_last_updated(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Option<DateTime<Utc>>> {
        let tables = self.tables.lock();
        Ok(date_range(&tables.settlements, asset_id, trade_date)
            .map(|row| row.entity.last_updated())
            .max())
    }

    fn settlements(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Vec<StoredRow<Settlement>>> {
        let tables = self.tables.lock();
        Ok(date_range(&tables.settlements, asset_id, trade_date)
            .cloned()
            .collect())
    }
}

impl VolumeOiRepository for InMemoryStore {
    fn create_volume_oi(&self, entity: &VolumeOi) -> PersistenceResult<StoredRow<VolumeOi>> {
        let mut tables = self.tables.lock();
        tables.require_asset(entity.asset_id())?;
        let key = (entity.asset_id(), entity.trade_date(), entity.month());
        if tables.volume_oi.contains_key(&key) {
            return Err(PersistenceError::Conflict(format!(
                "volume_oi asset={} trade_date={} month={}",
                key.0, key.1, key.2
            )));
        }
        let row = StoredRow {
            id: tables.allocate_row_id(),
            entity: entity.clone(),
        };
        tables.volume_oi.insert(key, row.clone());
        Ok(row)
    }

    fn update_volume_oi(&self, entity: &VolumeOi) -> PersistenceResult<StoredRow<VolumeOi>> {
        let mut tables = self.tables.lock();
        let key = (entity.asset_id(), entity.trade_date(), entity.month());
        let what = || format!("volume_oi asset={} trade_date={} month={}", key.0, key.1, key.2);
        let Some(row) = tables.volume_oi.get_mut(&key) else {
            return Err(PersistenceError::NotFound(what()));
        };
        if row.entity.is_final() {
            return Err(PersistenceError::Finalized(what()));
        }
        row.entity = entity.clone();
        Ok(row.clone())
    }

    fn volume_oi_is_final(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Option<bool>> {
        let tables = self.tables.lock();
        let mut rows = date_range(&tables.volume_oi, asset_id, trade_date).peekable();
        if rows.peek().is_none() {
            return Ok(None);
        }
        Ok(Some(rows.all(|row| row.entity.is_final())))
    }

    fn finalize_volume_oi(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<usize> {
        let mut tables = self.tables.lock();
        let mut promoted = 0;
        for ((a, d, _), row) in tables.volume_oi.iter_mut() {
            if *a == asset_id && *d == trade_date && !row.entity.is_final() {
                row.entity = row.entity.finalized();
                promoted += 1;
            }
        }
        Ok(promoted)
    }

    fn volume_oi(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Vec<StoredRow<VolumeOi>>> {
        let tables = self.tables.lock();
        Ok(date_range(&tables.volume_oi, asset_id, trade_date)
            .cloned()
            .collect())
    }
}

impl TradeDateRepository for InMemoryStore {
    fn trade_dates(
        &self,
        asset_id: AssetId,
        query: &TradeDateQuery,
    ) -> PersistenceResult<Vec<TradeDate>> {
        let tables = self.tables.lock();
        let mut dates: Vec<TradeDate> = tables
            .settlements
            .keys()
            .filter(|key| key.0 == asset_id && query.contains(key.1))
            .filter(|key| tables.volume_oi.contains_key(*key))
            .map(|key| key.1)
            .collect();
        dates.dedup();
        Ok(dates.into_iter().skip(query.skip).take(query.limit).collect())
    }
}
