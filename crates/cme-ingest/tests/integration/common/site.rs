//! Scripted exchange pages and pipeline plumbing for tests.

use cme_core::{AssetId, AssetName};
use cme_ingest::AssetTarget;
use cme_scraper::{DiagnosticsConfig, DiagnosticsWriter, ElementFinder, FinderConfig};
use tempfile::TempDir;

pub const CORN_SETTLEMENTS: &str = "https://example.test/corn/settlements";
pub const CORN_VOLUME: &str = "https://example.test/corn/volume";
pub const WHEAT_VOLUME: &str = "https://example.test/wheat/volume";
pub const SOYBEAN_VOLUME: &str = "https://example.test/soybean/volume";

/// Finder with millisecond waits, writing diagnostics into `dir`.
pub fn finder(dir: &TempDir) -> ElementFinder {
    ElementFinder::new(
        FinderConfig {
            wait_ms: 10,
            poll_interval_ms: 2,
            retries: 1,
        },
        DiagnosticsWriter::new(&DiagnosticsConfig {
            log_dir: dir.path().to_path_buf(),
        }),
    )
}

pub fn target(name: &str, asset_id: AssetId, url: &str) -> AssetTarget {
    AssetTarget {
        name: AssetName::new(name).unwrap(),
        asset_id,
        url: url.to_string(),
    }
}

/// Volume/OI cells in page order.
pub fn volume_row(month: &str, total_volume: &str) -> Vec<String> {
    [
        month,
        "1,020",
        "-",
        "15",
        total_volume,
        "0",
        "-",
        "-",
        "8",
        "-",
        "351,907",
        "-1,204",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Settlement cells in page order.
pub fn settlement_row(month: &str, settle: &str) -> Vec<String> {
    [
        month, "441'2", "445'0", "439'6", "444'4", "+3'2", settle, "98,112", "361,350",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
