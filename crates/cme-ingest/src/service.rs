//! Turns extracted rows into entities and writes them.
//!
//! Rows that fail entity validation are logged and dropped; the rest of the
//! table still goes through. A failed write stops the table: rows written
//! before it stay committed and the count is reported in the error.
//!
//! Stored final volume/OI rows are kept as they are. Once a final table has
//! been written in place, preliminary months it no longer lists are promoted
//! so the date reads as final on the next run.

use crate::error::{IngestError, IngestResult};
use chrono::{DateTime, Utc};
use cme_core::{
    AssetId, CoreResult, FreshnessAction, FreshnessSignal, RawRow, Settlement, TableKind,
    TradeDate, VolumeOi,
};
use cme_persistence::{MarketDataRepository, PersistenceError, PersistenceResult};
use cme_telemetry::Metrics;
use serde::Serialize;
use tracing::{debug, error, warn};

/// Result of writing one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    /// Rows inserted or updated.
    pub written: usize,
    /// Rows dropped by entity validation.
    pub rejected: usize,
    /// Final rows left as stored.
    pub unchanged: usize,
}

/// Entity-specific build and write steps.
trait Ingestible: Sized {
    const TABLE: TableKind;

    fn build(asset_id: AssetId, trade_date: TradeDate, row: &RawRow, signal: FreshnessSignal)
        -> CoreResult<Self>;

    fn create<S: MarketDataRepository + ?Sized>(&self, store: &S) -> PersistenceResult<i64>;

    fn update<S: MarketDataRepository + ?Sized>(&self, store: &S) -> PersistenceResult<i64>;

    /// Runs after every row of an in-place update was written. Returns the
    /// number of extra rows changed.
    fn complete<S: MarketDataRepository + ?Sized>(
        store: &S,
        asset_id: AssetId,
        trade_date: TradeDate,
        signal: FreshnessSignal,
    ) -> PersistenceResult<usize>;
}

fn signal_mismatch(table: TableKind, signal: FreshnessSignal) -> cme_core::CoreError {
    cme_core::CoreError::EntityValidation {
        field: "signal",
        reason: format!("{signal} does not apply to {table}"),
    }
}

impl Ingestible for Settlement {
    const TABLE: TableKind = TableKind::Settlements;

    fn build(
        asset_id: AssetId,
        trade_date: TradeDate,
        row: &RawRow,
        signal: FreshnessSignal,
    ) -> CoreResult<Self> {
        match signal {
            FreshnessSignal::LastUpdated(ts) => Settlement::from_scrape(asset_id, trade_date, row, ts),
            other => Err(signal_mismatch(Self::TABLE, other)),
        }
    }

    fn create<S: MarketDataRepository + ?Sized>(&self, store: &S) -> PersistenceResult<i64> {
        store.create_settlement(self).map(|r| r.id)
    }

    fn update<S: MarketDataRepository + ?Sized>(&self, store: &S) -> PersistenceResult<i64> {
        store.update_settlement(self).map(|r| r.id)
    }

    fn complete<S: MarketDataRepository + ?Sized>(
        _store: &S,
        _asset_id: AssetId,
        _trade_date: TradeDate,
        _signal: FreshnessSignal,
    ) -> PersistenceResult<usize> {
        Ok(0)
    }
}

impl Ingestible for VolumeOi {
    const TABLE: TableKind = TableKind::VolumeAndOpenInterest;

    fn build(
        asset_id: AssetId,
        trade_date: TradeDate,
        row: &RawRow,
        signal: FreshnessSignal,
    ) -> CoreResult<Self> {
        match signal {
            FreshnessSignal::Finality(is_final) => {
                VolumeOi::from_scrape(asset_id, trade_date, row, is_final)
            }
            other => Err(signal_mismatch(Self::TABLE, other)),
        }
    }

    fn create<S: MarketDataRepository + ?Sized>(&self, store: &S) -> PersistenceResult<i64> {
        store.create_volume_oi(self).map(|r| r.id)
    }

    fn update<S: MarketDataRepository + ?Sized>(&self, store: &S) -> PersistenceResult<i64> {
        store.update_volume_oi(self).map(|r| r.id)
    }

    fn complete<S: MarketDataRepository + ?Sized>(
        store: &S,
        asset_id: AssetId,
        trade_date: TradeDate,
        signal: FreshnessSignal,
    ) -> PersistenceResult<usize> {
        match signal {
            FreshnessSignal::Finality(true) => store.finalize_volume_oi(asset_id, trade_date),
            _ => Ok(0),
        }
    }
}

/// Writes extracted tables to a store.
pub struct IngestionService<'a, S: MarketDataRepository + ?Sized> {
    store: &'a S,
}

impl<'a, S: MarketDataRepository + ?Sized> IngestionService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Settlement rows published at `last_updated`.
    pub fn ingest_settlements(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
        last_updated: DateTime<Utc>,
        rows: &[RawRow],
        action: FreshnessAction,
    ) -> IngestResult<IngestOutcome> {
        self.ingest(
            asset_id,
            trade_date,
            FreshnessSignal::LastUpdated(last_updated),
            rows,
            action,
        )
    }

    /// Volume/OI rows carrying the page's finality flag.
    pub fn ingest_volume_oi(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
        is_final: bool,
        rows: &[RawRow],
        action: FreshnessAction,
    ) -> IngestResult<IngestOutcome> {
        self.ingest(
            asset_id,
            trade_date,
            FreshnessSignal::Finality(is_final),
            rows,
            action,
        )
    }

    /// Dispatch on the signal's table.
    pub fn ingest(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
        signal: FreshnessSignal,
        rows: &[RawRow],
        action: FreshnessAction,
    ) -> IngestResult<IngestOutcome> {
        match signal {
            FreshnessSignal::LastUpdated(_) => {
                self.write_all::<Settlement>(asset_id, trade_date, signal, rows, action)
            }
            FreshnessSignal::Finality(_) => {
                self.write_all::<VolumeOi>(asset_id, trade_date, signal, rows, action)
            }
        }
    }

    fn write_all<E: Ingestible>(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
        signal: FreshnessSignal,
        rows: &[RawRow],
        action: FreshnessAction,
    ) -> IngestResult<IngestOutcome> {
        let table = E::TABLE.as_str();
        let mut outcome = IngestOutcome::default();
        if action == FreshnessAction::Skip {
            return Ok(outcome);
        }

        for (index, row) in rows.iter().enumerate() {
            let entity = match E::build(asset_id, trade_date, row, signal) {
                Ok(entity) => entity,
                Err(e) => {
                    warn!(
                        table,
                        %asset_id,
                        %trade_date,
                        row = index,
                        month = row.get("month").unwrap_or("<missing>"),
                        error = %e,
                        "Rejected row"
                    );
                    Metrics::row_rejected(table);
                    outcome.rejected += 1;
                    continue;
                }
            };

            match self.write(&entity, action) {
                Ok(id) => {
                    debug!(table, %asset_id, %trade_date, id, %action, "Row written");
                    Metrics::rows_written(table, action.as_str(), 1);
                    outcome.written += 1;
                }
                Err(PersistenceError::Finalized(what)) => {
                    debug!(table, %asset_id, %trade_date, row = index, what = %what, "Row already final");
                    outcome.unchanged += 1;
                }
                Err(source) => {
                    error!(table, %asset_id, %trade_date, row = index, "Write failed");
                    return Err(abandon(table, outcome.written, source));
                }
            }
        }

        if action == FreshnessAction::UpdateInPlace {
            match E::complete(self.store, asset_id, trade_date, signal) {
                Ok(0) => {}
                Ok(promoted) => {
                    debug!(table, %asset_id, %trade_date, promoted, "Unlisted rows promoted");
                    Metrics::rows_written(table, "promote", promoted);
                    outcome.written += promoted;
                }
                Err(source) => return Err(abandon(table, outcome.written, source)),
            }
        }
        Ok(outcome)
    }

    fn write<E: Ingestible>(&self, entity: &E, action: FreshnessAction) -> PersistenceResult<i64> {
        match action {
            FreshnessAction::Insert => entity.create(self.store),
            // A contract month listed since the last scrape has nothing to update.
            FreshnessAction::UpdateInPlace => match entity.update(self.store) {
                Err(PersistenceError::NotFound(_)) => entity.create(self.store),
                other => other,
            },
            FreshnessAction::Skip => Ok(0),
        }
    }
}

fn abandon(table: &'static str, committed: usize, source: PersistenceError) -> IngestError {
    let kind = failure_kind(&source);
    error!(table, committed, kind, error = %source, "Abandoning table");
    Metrics::persistence_failure(table, kind);
    IngestError::Persistence { committed, source }
}

fn failure_kind(e: &PersistenceError) -> &'static str {
    match e {
        PersistenceError::Conflict(_) => "conflict",
        PersistenceError::Unavailable(_) => "unavailable",
        PersistenceError::NotFound(_) => "not_found",
        PersistenceError::Finalized(_) => "finalized",
        PersistenceError::AssetNotFound(_) => "asset_not_found",
        PersistenceError::Corrupt(_) => "corrupt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cme_core::AssetName;
    use cme_persistence::{AssetDirectory, InMemoryStore, SettlementRepository, VolumeOiRepository};

    fn date() -> TradeDate {
        TradeDate::parse_iso("2024-05-03").unwrap()
    }

    fn vol(month: &str, total: &str) -> RawRow {
        RawRow::from_cells(
            TableKind::VolumeAndOpenInterest,
            [month, "100", "-", "2", total, "-", "-", "-", "-", "-", "5,000", "-12"],
        )
    }

    fn settle(month: &str, price: &str) -> RawRow {
        RawRow::from_cells(
            TableKind::Settlements,
            [month, "-", "-", "-", "-", "-", price, "310", "12,004"],
        )
    }

    fn store() -> (InMemoryStore, AssetId) {
        let store = InMemoryStore::new();
        let id = store.register_asset(&AssetName::new("corn").unwrap()).unwrap();
        (store, id)
    }

    #[test]
    fn test_invalid_row_is_skipped_rest_written() {
        let (store, id) = store();
        let rows = [vol("MAY 24", "102"), vol("JUL 24", "-5"), vol("SEP 24", "40")];

        let outcome = IngestionService::new(&store)
            .ingest_volume_oi(id, date(), false, &rows, FreshnessAction::Insert)
            .unwrap();

        assert_eq!(
            outcome,
            IngestOutcome {
                written: 2,
                rejected: 1,
                unchanged: 0
            }
        );
        let stored = store.volume_oi(id, date()).unwrap();
        let months: Vec<String> = stored.iter().map(|r| r.entity.month().to_db_format()).collect();
        assert_eq!(months, vec!["2024-05", "2024-09"]);
    }

    #[test]
    fn test_update_promotes_and_creates_new_months() {
        let (store, id) = store();
        let service = IngestionService::new(&store);
        service
            .ingest_volume_oi(id, date(), false, &[vol("MAY 24", "102")], FreshnessAction::Insert)
            .unwrap();

        let outcome = service
            .ingest_volume_oi(
                id,
                date(),
                true,
                &[vol("MAY 24", "110"), vol("JUL 24", "7")],
                FreshnessAction::UpdateInPlace,
            )
            .unwrap();

        assert_eq!(outcome.written, 2);
        let stored = store.volume_oi(id, date()).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|r| r.entity.is_final()));
        assert_eq!(stored[0].entity.total_volume(), 110);
        assert_eq!(store.volume_oi_is_final(id, date()).unwrap(), Some(true));
    }

    #[test]
    fn test_partly_final_date_keeps_final_rows() {
        let (store, id) = store();
        let service = IngestionService::new(&store);
        service
            .ingest_volume_oi(id, date(), true, &[vol("MAY 24", "102")], FreshnessAction::Insert)
            .unwrap();
        service
            .ingest_volume_oi(
                id,
                date(),
                false,
                &[vol("JUL 24", "5"), vol("SEP 24", "3")],
                FreshnessAction::Insert,
            )
            .unwrap();

        let outcome = service
            .ingest_volume_oi(
                id,
                date(),
                true,
                &[vol("MAY 24", "999"), vol("JUL 24", "7")],
                FreshnessAction::UpdateInPlace,
            )
            .unwrap();

        // JUL updated, SEP promoted, MAY untouched.
        assert_eq!(
            outcome,
            IngestOutcome {
                written: 2,
                rejected: 0,
                unchanged: 1
            }
        );
        let stored = store.volume_oi(id, date()).unwrap();
        assert_eq!(stored[0].entity.total_volume(), 102);
        assert_eq!(stored[1].entity.total_volume(), 7);
        assert_eq!(stored[2].entity.total_volume(), 3);
        assert_eq!(store.volume_oi_is_final(id, date()).unwrap(), Some(true));
    }

    #[test]
    fn test_conflict_reports_committed_rows() {
        let (store, id) = store();
        let published = Utc.with_ymd_and_hms(2024, 5, 4, 3, 32, 0).unwrap();
        let rows = [settle("MAY 24", "441'2"), settle("JUL 24", "450'0"), settle("MAY 24", "441'4")];

        let err = IngestionService::new(&store)
            .ingest_settlements(id, date(), published, &rows, FreshnessAction::Insert)
            .unwrap_err();

        let IngestError::Persistence { committed, source } = err;
        assert_eq!(committed, 2);
        assert!(source.is_conflict());
        assert_eq!(store.settlements(id, date()).unwrap().len(), 2);
    }

    #[test]
    fn test_skip_writes_nothing() {
        let (store, id) = store();
        let outcome = IngestionService::new(&store)
            .ingest_volume_oi(id, date(), true, &[vol("MAY 24", "1")], FreshnessAction::Skip)
            .unwrap();
        assert_eq!(outcome, IngestOutcome::default());
        assert!(store.volume_oi(id, date()).unwrap().is_empty());
    }

    #[test]
    fn test_unregistered_asset_fails_first_write() {
        let store = InMemoryStore::new();
        let err = IngestionService::new(&store)
            .ingest_volume_oi(AssetId(99), date(), true, &[vol("MAY 24", "1")], FreshnessAction::Insert)
            .unwrap_err();
        assert_eq!(err.committed(), 0);
    }
}
