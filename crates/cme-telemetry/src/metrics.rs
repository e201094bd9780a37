//! Prometheus metrics for ingestion runs.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught on first use.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_int_counter, CounterVec, Encoder, Gauge,
    IntCounter, TextEncoder,
};
use std::path::Path;

/// Rows written to the store.
/// Labels: table (settlements/volume_and_open_interest), action (insert/update)
pub static ROWS_WRITTEN_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cme_rows_written_total",
        "Rows written to the store",
        &["table", "action"]
    )
    .unwrap()
});

/// Rows dropped because an entity could not be built from them.
pub static ROWS_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cme_rows_rejected_total",
        "Rows rejected by entity validation",
        &["table"]
    )
    .unwrap()
});

/// Per-date outcome of the reconcile step.
/// Labels: table, outcome (insert/update/skip/unavailable/error)
pub static DATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cme_dates_total",
        "Trade dates processed by outcome",
        &["table", "outcome"]
    )
    .unwrap()
});

/// Writes that failed at the persistence boundary.
pub static PERSISTENCE_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cme_persistence_failures_total",
        "Failed repository writes",
        &["table", "kind"]
    )
    .unwrap()
});

/// Element lookup attempts that timed out and were retried.
pub static LOOKUP_RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cme_element_lookup_retries_total",
        "Element lookup attempts that timed out",
        &["escalation"]
    )
    .unwrap()
});

/// Runs aborted by a fatal element lookup.
pub static FATAL_ABORTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cme_fatal_aborts_total",
        "Runs aborted by an unrecoverable page failure"
    )
    .unwrap()
});

/// Unix time of the last completed run.
pub static LAST_RUN_TIMESTAMP: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "cme_last_run_timestamp_seconds",
        "Unix time the last run finished"
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    pub fn rows_written(table: &str, action: &str, count: usize) {
        ROWS_WRITTEN_TOTAL
            .with_label_values(&[table, action])
            .inc_by(count as f64);
    }

    pub fn row_rejected(table: &str) {
        ROWS_REJECTED_TOTAL.with_label_values(&[table]).inc();
    }

    pub fn date_outcome(table: &str, outcome: &str) {
        DATES_TOTAL.with_label_values(&[table, outcome]).inc();
    }

    pub fn persistence_failure(table: &str, kind: &str) {
        PERSISTENCE_FAILURES_TOTAL
            .with_label_values(&[table, kind])
            .inc();
    }

    pub fn lookup_retry(escalation: &str) {
        LOOKUP_RETRIES_TOTAL.with_label_values(&[escalation]).inc();
    }

    pub fn fatal_abort() {
        FATAL_ABORTS_TOTAL.inc();
    }

    pub fn run_finished() {
        LAST_RUN_TIMESTAMP.set(chrono::Utc::now().timestamp() as f64);
    }

    /// Render every registered metric in the text exposition format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the exposition to `path` for the node-exporter textfile collector.
    ///
    /// Writes to a sibling temp file first so the collector never reads a
    /// partial file.
    pub fn write_textfile(path: &Path) -> TelemetryResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, Metrics::render()?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_counters_show_up_in_render() {
        Metrics::rows_written("settlements", "insert", 3);
        Metrics::row_rejected("volume_and_open_interest");
        Metrics::fatal_abort();

        let text = Metrics::render().unwrap();
        assert!(text.contains("cme_rows_written_total"));
        assert!(text.contains("cme_rows_rejected_total"));
        assert!(text.contains("cme_fatal_aborts_total"));
    }

    #[test]
    fn test_write_textfile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("textfile").join("cme.prom");
        Metrics::date_outcome("settlements", "skip");
        Metrics::write_textfile(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("cme_dates_total"));
        assert!(!path.with_extension("prom.tmp").exists());
    }
}
