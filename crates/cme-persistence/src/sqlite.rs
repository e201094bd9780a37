//! SQLite-backed store.
//!
//! Timestamps are stored as UTC epoch milliseconds and contract months in
//! `YYYY-MM` form so that ordering by the text column matches calendar order.

use crate::error::{PersistenceError, PersistenceResult};
use crate::repository::{
    AssetDirectory, SettlementRepository, StoredRow, TradeDateQuery, TradeDateRepository,
    VolumeOiRepository,
};
use chrono::{DateTime, Utc};
use cme_core::{
    Asset, AssetId, AssetName, Settlement, SettlementRecord, TradeDate, VolumeOi, VolumeOiRecord,
};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info, warn};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE CHECK (length(name) BETWEEN 1 AND 64)
);

CREATE TABLE IF NOT EXISTS settlements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_id INTEGER NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
    trade_date TEXT NOT NULL,
    month TEXT NOT NULL,
    open TEXT,
    high TEXT,
    low TEXT,
    last TEXT,
    change TEXT,
    settle TEXT NOT NULL,
    est_volume INTEGER NOT NULL CHECK (est_volume >= 0),
    prior_day_oi INTEGER NOT NULL CHECK (prior_day_oi >= 0),
    last_updated_ms INTEGER NOT NULL,
    UNIQUE (asset_id, trade_date, month)
);

CREATE TABLE IF NOT EXISTS volume_oi (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_id INTEGER NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
    trade_date TEXT NOT NULL,
    month TEXT NOT NULL,
    globex INTEGER,
    open_outcry INTEGER,
    clear_port INTEGER,
    total_volume INTEGER NOT NULL CHECK (total_volume >= 0),
    block_trades INTEGER,
    efp INTEGER,
    efr INTEGER,
    tas INTEGER,
    deliveries INTEGER,
    at_close INTEGER NOT NULL CHECK (at_close >= 0),
    change INTEGER,
    is_final INTEGER NOT NULL,
    UNIQUE (asset_id, trade_date, month)
);
";

const SETTLEMENT_COLUMNS: &str = "id, asset_id, trade_date, month, open, high, low, last, change, \
     settle, est_volume, prior_day_oi, last_updated_ms";

const VOLUME_OI_COLUMNS: &str = "id, asset_id, trade_date, month, globex, open_outcry, clear_port, \
     total_volume, block_trades, efp, efr, tas, deliveries, at_close, change, is_final";

/// Relational store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::Unavailable(format!("create {parent:?}: {e}")))?;
        }
        let conn = Connection::open(path)?;
        match conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get::<_, String>(0)) {
            Ok(mode) if mode.eq_ignore_ascii_case("wal") => {}
            Ok(mode) => warn!(path = %path.display(), journal_mode = %mode, "WAL mode not active"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to enable WAL mode"),
        }
        if let Err(e) = conn.pragma_update(None, "synchronous", "NORMAL") {
            warn!(path = %path.display(), error = %e, "Failed to set synchronous mode");
        }
        let store = Self::init(conn)?;
        info!(path = %path.display(), "Opened SQLite store");
        Ok(store)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> PersistenceResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> PersistenceResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Foreign-key failures mean the entity points at an unregistered asset.
fn write_error(e: rusqlite::Error, asset_id: AssetId) -> PersistenceError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &e {
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
            return PersistenceError::AssetNotFound(asset_id);
        }
    }
    PersistenceError::from(e)
}

fn not_found(e: rusqlite::Error, what: &str) -> PersistenceError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => PersistenceError::NotFound(what.to_string()),
        other => PersistenceError::from(other),
    }
}

fn settlement_record(row: &Row<'_>) -> rusqlite::Result<(i64, SettlementRecord)> {
    Ok((
        row.get(0)?,
        SettlementRecord {
            asset_id: row.get(1)?,
            trade_date: row.get(2)?,
            month: row.get(3)?,
            open: row.get(4)?,
            high: row.get(5)?,
            low: row.get(6)?,
            last: row.get(7)?,
            change: row.get(8)?,
            settle: row.get(9)?,
            est_volume: row.get(10)?,
            prior_day_oi: row.get(11)?,
            last_updated_ms: row.get(12)?,
        },
    ))
}

fn volume_oi_record(row: &Row<'_>) -> rusqlite::Result<(i64, VolumeOiRecord)> {
    Ok((
        row.get(0)?,
        VolumeOiRecord {
            asset_id: row.get(1)?,
            trade_date: row.get(2)?,
            month: row.get(3)?,
            globex: row.get(4)?,
            open_outcry: row.get(5)?,
            clear_port: row.get(6)?,
            total_volume: row.get(7)?,
            block_trades: row.get(8)?,
            efp: row.get(9)?,
            efr: row.get(10)?,
            tas: row.get(11)?,
            deliveries: row.get(12)?,
            at_close: row.get(13)?,
            change: row.get(14)?,
            is_final: row.get(15)?,
        },
    ))
}

impl AssetDirectory for SqliteStore {
    fn asset_id(&self, name: &AssetName) -> PersistenceResult<Option<AssetId>> {
        let conn = self.conn.lock();
        let id = conn
            .query_row(
                "SELECT id FROM assets WHERE name = ?1",
                params![name.as_str()],
                |r| r.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(AssetId))
    }

    fn register_asset(&self, name: &AssetName) -> PersistenceResult<AssetId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO assets (name) VALUES (?1)",
            params![name.as_str()],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM assets WHERE name = ?1",
            params![name.as_str()],
            |r| r.get(0),
        )?;
        debug!(asset = %name, asset_id = id, "Registered asset");
        Ok(AssetId(id))
    }

    fn remove_asset(&self, name: &AssetName) -> PersistenceResult<bool> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM assets WHERE name = ?1", params![name.as_str()])?;
        Ok(removed > 0)
    }

    fn assets(&self) -> PersistenceResult<Vec<Asset>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT id, name FROM assets ORDER BY id")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;

        let mut assets = Vec::new();
        for row in rows {
            let (id, name) = row?;
            assets.push(Asset::new(AssetId(id), AssetName::new(name)?));
        }
        Ok(assets)
    }
}

impl SettlementRepository for SqliteStore {
    fn create_settlement(&self, entity: &Settlement) -> PersistenceResult<StoredRow<Settlement>> {
        let r = entity.to_record()?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO settlements (asset_id, trade_date, month, open, high, low, last, change, \
             settle, est_volume, prior_day_oi, last_updated_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                r.asset_id,
                r.trade_date,
                r.month,
                r.open,
                r.high,
                r.low,
                r.last,
                r.change,
                r.settle,
                r.est_volume,
                r.prior_day_oi,
                r.last_updated_ms
            ],
        )
        .map_err(|e| write_error(e, entity.asset_id()))?;

        Ok(StoredRow {
            id: conn.last_insert_rowid(),
            entity: entity.clone(),
        })
    }

    fn update_settlement(&self, entity: &Settlement) -> PersistenceResult<StoredRow<Settlement>> {
        let r = entity.to_record()?;
        let conn = self.conn.lock();
        let id: i64 = conn
            .query_row(
                "UPDATE settlements SET open = ?4, high = ?5, low = ?6, last = ?7, change = ?8, \
                 settle = ?9, est_volume = ?10, prior_day_oi = ?11, last_updated_ms = ?12 \
                 WHERE asset_id = ?1 AND trade_date = ?2 AND month = ?3 RETURNING id",
                params![
                    r.asset_id,
                    r.trade_date,
                    r.month,
                    r.open,
                    r.high,
                    r.low,
                    r.last,
                    r.change,
                    r.settle,
                    r.est_volume,
                    r.prior_day_oi,
                    r.last_updated_ms
                ],
                |row| row.get(0),
            )
            .map_err(|e| {
                not_found(
                    e,
                    &format!(
                        "settlement asset={} trade_date={} month={}",
                        r.asset_id, r.trade_date, r.month
                    ),
                )
            })?;

        Ok(StoredRow {
            id,
            entity: entity.clone(),
        })
    }

    fn settlement_last_updated(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Option<DateTime<Utc>>> {
        let conn = self.conn.lock();
        let millis: Option<i64> = conn.query_row(
            "SELECT MAX(last_updated_ms) FROM settlements WHERE asset_id = ?1 AND trade_date = ?2",
            params![asset_id.0, trade_date.to_string()],
            |r| r.get(0),
        )?;
        millis
            .map(cme_core::timestamp::from_millis)
            .transpose()
            .map_err(PersistenceError::from)
    }

    fn settlements(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Vec<StoredRow<Settlement>>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SETTLEMENT_COLUMNS} FROM settlements \
             WHERE asset_id = ?1 AND trade_date = ?2 ORDER BY month"
        ))?;
        let rows = stmt.query_map(params![asset_id.0, trade_date.to_string()], settlement_record)?;

        let mut out = Vec::new();
        for row in rows {
            let (id, record) = row?;
            out.push(StoredRow {
                id,
                entity: Settlement::from_store(record)?,
            });
        }
        Ok(out)
    }
}

impl VolumeOiRepository for SqliteStore {
    fn create_volume_oi(&self, entity: &VolumeOi) -> PersistenceResult<StoredRow<VolumeOi>> {
        let r = entity.to_record()?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO volume_oi (asset_id, trade_date, month, globex, open_outcry, clear_port, \
             total_volume, block_trades, efp, efr, tas, deliveries, at_close, change, is_final) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                r.asset_id,
                r.trade_date,
                r.month,
                r.globex,
                r.open_outcry,
                r.clear_port,
                r.total_volume,
                r.block_trades,
                r.efp,
                r.efr,
                r.tas,
                r.deliveries,
                r.at_close,
                r.change,
                r.is_final
            ],
        )
        .map_err(|e| write_error(e, entity.asset_id()))?;

        Ok(StoredRow {
            id: conn.last_insert_rowid(),
            entity: entity.clone(),
        })
    }

    fn update_volume_oi(&self, entity: &VolumeOi) -> PersistenceResult<StoredRow<VolumeOi>> {
        let r = entity.to_record()?;
        let conn = self.conn.lock();
        let id: Option<i64> = conn
            .query_row(
                "UPDATE volume_oi SET globex = ?4, open_outcry = ?5, clear_port = ?6, \
                 total_volume = ?7, block_trades = ?8, efp = ?9, efr = ?10, tas = ?11, \
                 deliveries = ?12, at_close = ?13, change = ?14, is_final = ?15 \
                 WHERE asset_id = ?1 AND trade_date = ?2 AND month = ?3 AND is_final = 0 \
                 RETURNING id",
                params![
                    r.asset_id,
                    r.trade_date,
                    r.month,
                    r.globex,
                    r.open_outcry,
                    r.clear_port,
                    r.total_volume,
                    r.block_trades,
                    r.efp,
                    r.efr,
                    r.tas,
                    r.deliveries,
                    r.at_close,
                    r.change,
                    r.is_final
                ],
                |row| row.get(0),
            )
            .optional()?;

        let Some(id) = id else {
            let what = format!(
                "volume_oi asset={} trade_date={} month={}",
                r.asset_id, r.trade_date, r.month
            );
            let exists = conn
                .query_row(
                    "SELECT 1 FROM volume_oi WHERE asset_id = ?1 AND trade_date = ?2 AND month = ?3",
                    params![r.asset_id, r.trade_date, r.month],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            return Err(match exists {
                Some(_) => PersistenceError::Finalized(what),
                None => PersistenceError::NotFound(what),
            });
        };

        Ok(StoredRow {
            id,
            entity: entity.clone(),
        })
    }

    fn volume_oi_is_final(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Option<bool>> {
        let conn = self.conn.lock();
        let all_final: Option<i64> = conn.query_row(
            "SELECT MIN(is_final) FROM volume_oi WHERE asset_id = ?1 AND trade_date = ?2",
            params![asset_id.0, trade_date.to_string()],
            |r| r.get(0),
        )?;
        Ok(all_final.map(|v| v != 0))
    }

    fn finalize_volume_oi(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<usize> {
        let conn = self.conn.lock();
        let promoted = conn.execute(
            "UPDATE volume_oi SET is_final = 1 \
             WHERE asset_id = ?1 AND trade_date = ?2 AND is_final = 0",
            params![asset_id.0, trade_date.to_string()],
        )?;
        Ok(promoted)
    }

    fn volume_oi(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
    ) -> PersistenceResult<Vec<StoredRow<VolumeOi>>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {VOLUME_OI_COLUMNS} FROM volume_oi \
             WHERE asset_id = ?1 AND trade_date = ?2 ORDER BY month"
        ))?;
        let rows = stmt.query_map(params![asset_id.0, trade_date.to_string()], volume_oi_record)?;

        let mut out = Vec::new();
        for row in rows {
            let (id, record) = row?;
            out.push(StoredRow {
                id,
                entity: VolumeOi::from_store(record)?,
            });
        }
        Ok(out)
    }
}

impl TradeDateRepository for SqliteStore {
    fn trade_dates(
        &self,
        asset_id: AssetId,
        query: &TradeDateQuery,
    ) -> PersistenceResult<Vec<TradeDate>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT s.trade_date FROM settlements s \
             JOIN volume_oi v ON s.asset_id = v.asset_id \
                AND s.trade_date = v.trade_date AND s.month = v.month \
             WHERE s.asset_id = ?1 \
                AND (?2 IS NULL OR s.trade_date >= ?2) \
                AND (?3 IS NULL OR s.trade_date <= ?3) \
             ORDER BY s.trade_date LIMIT ?4 OFFSET ?5",
        )?;
        let rows = stmt.query_map(
            params![
                asset_id.0,
                query.start.map(|d| d.to_string()),
                query.end.map(|d| d.to_string()),
                i64::try_from(query.limit).unwrap_or(i64::MAX),
                i64::try_from(query.skip).unwrap_or(i64::MAX)
            ],
            |r| r.get::<_, String>(0),
        )?;

        let mut dates = Vec::new();
        for row in rows {
            dates.push(TradeDate::parse_iso(&row?)?);
        }
        Ok(dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cme_core::{parse_last_updated, RawRow, TableKind};
    use tempfile::TempDir;

    fn date() -> TradeDate {
        TradeDate::from_string("Friday, 08 Mar 2024").unwrap()
    }

    fn settlement(asset: AssetId, month: &str, stamp: &str) -> Settlement {
        let row = RawRow::from_cells(
            TableKind::Settlements,
            [month, "442'6", "-", "-", "-", "-'27", "443'4", "1,200", "35,000"],
        );
        Settlement::from_scrape(asset, date(), &row, parse_last_updated(stamp).unwrap()).unwrap()
    }

    fn volume(asset: AssetId, month: &str, is_final: bool) -> VolumeOi {
        let row = RawRow::from_cells(
            TableKind::VolumeAndOpenInterest,
            [month, "10", "-", "2", "12", "-", "-", "-", "-", "-", "900", "-40"],
        );
        VolumeOi::from_scrape(asset, date(), &row, is_final).unwrap()
    }

    fn corn(store: &SqliteStore) -> AssetId {
        store
            .register_asset(&AssetName::new("corn").unwrap())
            .unwrap()
    }

    #[test]
    fn test_settlement_roundtrip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db").join("market.sqlite");
        let stored = {
            let store = SqliteStore::open(&path).unwrap();
            let id = corn(&store);
            store
                .create_settlement(&settlement(id, "MAY 24", "08 Mar 2024 04:00:00 PM CT"))
                .unwrap()
        };

        let reopened = SqliteStore::open(&path).unwrap();
        let rows = reopened
            .settlements(stored.entity.asset_id(), date())
            .unwrap();
        assert_eq!(rows, vec![stored]);
    }

    #[test]
    fn test_file_store_runs_in_wal_mode() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("wal.sqlite")).unwrap();
        let mode: String = store
            .conn
            .lock()
            .query_row("PRAGMA journal_mode", [], |r| r.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_unique_key_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = corn(&store);
        let s = settlement(id, "MAY 24", "08 Mar 2024 04:00:00 PM CT");
        store.create_settlement(&s).unwrap();
        let err = store.create_settlement(&s).unwrap_err();
        assert!(err.is_conflict(), "got {err:?}");
    }

    #[test]
    fn test_unknown_asset_maps_to_asset_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .create_volume_oi(&volume(AssetId(77), "MAY 24", true))
            .unwrap_err();
        assert!(matches!(err, PersistenceError::AssetNotFound(AssetId(77))));
    }

    #[test]
    fn test_update_in_place_keeps_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = corn(&store);
        let first = store
            .create_volume_oi(&volume(id, "MAY 24", false))
            .unwrap();
        assert_eq!(store.volume_oi_is_final(id, date()).unwrap(), Some(false));

        let second = store.update_volume_oi(&volume(id, "MAY 24", true)).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.volume_oi_is_final(id, date()).unwrap(), Some(true));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = corn(&store);
        let err = store
            .update_settlement(&settlement(id, "MAY 24", "08 Mar 2024 04:00:00 PM CT"))
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }

    #[test]
    fn test_freshness_lookups_empty_and_aggregates() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = corn(&store);
        assert_eq!(store.settlement_last_updated(id, date()).unwrap(), None);
        assert_eq!(store.volume_oi_is_final(id, date()).unwrap(), None);

        let early = settlement(id, "MAY 24", "08 Mar 2024 04:00:00 PM CT");
        let late = settlement(id, "JUL 24", "08 Mar 2024 05:30:00 PM CT");
        store.create_settlement(&late).unwrap();
        store.create_settlement(&early).unwrap();
        assert_eq!(
            store.settlement_last_updated(id, date()).unwrap(),
            Some(late.last_updated())
        );

        store.create_volume_oi(&volume(id, "MAY 24", true)).unwrap();
        store.create_volume_oi(&volume(id, "JUL 24", false)).unwrap();
        assert_eq!(store.volume_oi_is_final(id, date()).unwrap(), Some(false));
    }

    #[test]
    fn test_final_row_is_not_overwritten() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = corn(&store);
        let stored = store.create_volume_oi(&volume(id, "MAY 24", true)).unwrap();

        let err = store
            .update_volume_oi(&volume(id, "MAY 24", false))
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Finalized(_)), "got {err:?}");
        assert_eq!(store.volume_oi(id, date()).unwrap(), vec![stored]);

        let err = store
            .update_volume_oi(&volume(id, "JUL 24", true))
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)), "got {err:?}");
    }

    #[test]
    fn test_finalize_promotes_preliminary_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = corn(&store);
        store.create_volume_oi(&volume(id, "MAY 24", true)).unwrap();
        store.create_volume_oi(&volume(id, "JUL 24", false)).unwrap();

        assert_eq!(store.finalize_volume_oi(id, date()).unwrap(), 1);
        assert_eq!(store.volume_oi_is_final(id, date()).unwrap(), Some(true));
        assert!(store
            .volume_oi(id, date())
            .unwrap()
            .iter()
            .all(|r| r.entity.is_final()));
    }

    #[test]
    fn test_trade_dates_join_range_and_paging() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = corn(&store);
        let days = ["2024-03-06", "2024-03-07", "2024-03-08", "2024-03-11"];
        for day in days {
            let trade_date = TradeDate::parse_iso(day).unwrap();
            let row = RawRow::from_cells(
                TableKind::Settlements,
                ["MAY 24", "-", "-", "-", "-", "-", "443'4", "1,200", "35,000"],
            );
            let stamp = parse_last_updated("08 Mar 2024 04:00:00 PM CT").unwrap();
            store
                .create_settlement(&Settlement::from_scrape(id, trade_date, &row, stamp).unwrap())
                .unwrap();
        }
        // Only 2024-03-08 has a volume/OI row for the same month.
        store.create_volume_oi(&volume(id, "MAY 24", true)).unwrap();
        store.create_volume_oi(&volume(id, "JUL 24", true)).unwrap();

        let all = store.trade_dates(id, &TradeDateQuery::default()).unwrap();
        assert_eq!(all, vec![date()]);

        let other = store
            .register_asset(&AssetName::new("wheat").unwrap())
            .unwrap();
        assert!(store.trade_dates(other, &TradeDateQuery::default()).unwrap().is_empty());

        for day in ["2024-03-06", "2024-03-07", "2024-03-11"] {
            let trade_date = TradeDate::parse_iso(day).unwrap();
            let row = RawRow::from_cells(
                TableKind::VolumeAndOpenInterest,
                ["MAY 24", "10", "-", "2", "12", "-", "-", "-", "-", "-", "900", "-40"],
            );
            store
                .create_volume_oi(&VolumeOi::from_scrape(id, trade_date, &row, true).unwrap())
                .unwrap();
        }

        let query = TradeDateQuery {
            start: TradeDate::parse_iso("2024-03-07").ok(),
            end: TradeDate::parse_iso("2024-03-11").ok(),
            skip: 1,
            limit: 1,
        };
        assert_eq!(
            store.trade_dates(id, &query).unwrap(),
            vec![TradeDate::parse_iso("2024-03-08").unwrap()]
        );

        let all = store.trade_dates(id, &TradeDateQuery::default()).unwrap();
        let days: Vec<String> = all.iter().map(|d| d.to_string()).collect();
        assert_eq!(days, vec!["2024-03-06", "2024-03-07", "2024-03-08", "2024-03-11"]);
    }

    #[test]
    fn test_remove_asset_cascades() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = corn(&store);
        store.create_volume_oi(&volume(id, "MAY 24", true)).unwrap();
        store
            .create_settlement(&settlement(id, "MAY 24", "08 Mar 2024 04:00:00 PM CT"))
            .unwrap();

        assert!(store.remove_asset(&AssetName::new("corn").unwrap()).unwrap());
        assert!(store.volume_oi(id, date()).unwrap().is_empty());
        assert!(store.settlements(id, date()).unwrap().is_empty());
        assert_eq!(store.asset_id(&AssetName::new("corn").unwrap()).unwrap(), None);
    }
}
