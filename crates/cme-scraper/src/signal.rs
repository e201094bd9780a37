//! Freshness labels printed above each table.

use crate::error::{ScrapeError, ScrapeResult};
use cme_core::{parse_last_updated, FreshnessSignal, TableKind};

/// Interpret a label for the given table kind.
///
/// Settlements print a Chicago timestamp. Volume/OI print a data-type label
/// such as `"DATA TYPE: PRELIMINARY"` or `"DATA TYPE: FINAL"`.
pub fn parse_signal(kind: TableKind, label: &str) -> ScrapeResult<FreshnessSignal> {
    match kind {
        TableKind::Settlements => parse_last_updated(label)
            .map(FreshnessSignal::LastUpdated)
            .map_err(|_| ScrapeError::InvalidSignal(label.to_string())),
        TableKind::VolumeAndOpenInterest => parse_finality(label).map(FreshnessSignal::Finality),
    }
}

/// `true` for final data, `false` for preliminary data.
pub fn parse_finality(label: &str) -> ScrapeResult<bool> {
    let upper = label.to_ascii_uppercase();
    if upper.contains("PRELIMINARY") {
        Ok(false)
    } else if upper.contains("FINAL") {
        Ok(true)
    } else {
        Err(ScrapeError::InvalidSignal(label.to_string()))
    }
}
