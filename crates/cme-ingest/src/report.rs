//! Per-run summary.

use cme_core::{FreshnessAction, TableKind, TradeDate};
use serde::Serialize;
use tracing::info;

/// A date or asset that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    pub asset: String,
    pub trade_date: Option<TradeDate>,
    pub error: String,
}

/// What one pass over the configured assets did for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub table: TableKind,
    pub assets: usize,
    pub dates_seen: usize,
    pub dates_inserted: usize,
    pub dates_updated: usize,
    pub dates_skipped: usize,
    pub rows_written: usize,
    pub rows_rejected: usize,
    /// Final rows a write left as stored.
    pub rows_unchanged: usize,
    pub persistence_failures: usize,
    pub failures: Vec<RunFailure>,
    /// Set when a fatal page failure ended the run early.
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn new(table: TableKind) -> Self {
        Self {
            table,
            assets: 0,
            dates_seen: 0,
            dates_inserted: 0,
            dates_updated: 0,
            dates_skipped: 0,
            rows_written: 0,
            rows_rejected: 0,
            rows_unchanged: 0,
            persistence_failures: 0,
            failures: Vec::new(),
            aborted: None,
        }
    }

    pub fn record_action(&mut self, action: FreshnessAction) {
        match action {
            FreshnessAction::Insert => self.dates_inserted += 1,
            FreshnessAction::UpdateInPlace => self.dates_updated += 1,
            FreshnessAction::Skip => self.dates_skipped += 1,
        }
    }

    pub fn record_failure(
        &mut self,
        asset: impl Into<String>,
        trade_date: Option<TradeDate>,
        error: impl ToString,
    ) {
        self.failures.push(RunFailure {
            asset: asset.into(),
            trade_date,
            error: error.to_string(),
        });
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn log(&self) {
        info!(
            table = %self.table,
            assets = self.assets,
            dates_seen = self.dates_seen,
            inserted = self.dates_inserted,
            updated = self.dates_updated,
            skipped = self.dates_skipped,
            rows_written = self.rows_written,
            rows_rejected = self.rows_rejected,
            rows_unchanged = self.rows_unchanged,
            persistence_failures = self.persistence_failures,
            failures = self.failures.len(),
            aborted = self.aborted.as_deref().unwrap_or("no"),
            "Run finished"
        );
    }
}
