//! End-to-end runs against scripted pages and the in-memory store.

mod integration;
use integration::common::site::{
    finder, settlement_row, target, volume_row, CORN_SETTLEMENTS, CORN_VOLUME, SOYBEAN_VOLUME,
    WHEAT_VOLUME,
};

use cme_core::{
    parse_last_updated, AssetId, AssetName, FreshnessAction, RawRow, Settlement, TableKind,
    TradeDate,
};
use cme_ingest::{
    AppConfig, Application, AssetUrls, IngestionService, ScrapeOrchestrator, TelemetryConfig,
};
use cme_persistence::{
    AssetDirectory, InMemoryStore, MarketDataStore, SettlementRepository, VolumeOiRepository,
};
use cme_scraper::fake::{FakeBrowser, FakeDate, FakePage};
use cme_scraper::PageLayout;
use tempfile::TempDir;

fn may_3() -> TradeDate {
    TradeDate::parse_iso("2024-05-03").unwrap()
}

fn corn(store: &InMemoryStore) -> AssetId {
    store.register_asset(&AssetName::new("corn").unwrap()).unwrap()
}

#[tokio::test]
async fn test_first_final_scrape_inserts_final_rows() {
    let dir = TempDir::new().unwrap();
    let store = InMemoryStore::new();
    let id = corn(&store);
    let layout = PageLayout::default();
    let browser = FakeBrowser::new(layout.clone()).with_page(
        CORN_VOLUME,
        FakePage::new().date(
            FakeDate::new("Friday, 03 May 2024", "DATA TYPE: FINAL")
                .row(volume_row("MAY 24", "102,411"))
                .row(volume_row("JLY 24", "88,003"))
                .collapsed(),
        ),
    );
    let finder = finder(&dir);

    let report = ScrapeOrchestrator::new(&browser, &store, &finder, &layout)
        .run(
            TableKind::VolumeAndOpenInterest,
            &[target("corn", id, CORN_VOLUME)],
        )
        .await;

    assert!(!report.is_aborted());
    assert_eq!(report.dates_seen, 1);
    assert_eq!(report.dates_inserted, 1);
    assert_eq!(report.rows_written, 2);

    let stored = store.volume_oi(id, may_3()).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|r| r.entity.is_final()));
    assert_eq!(stored[1].entity.month().to_db_format(), "2024-07");
    assert_eq!(stored[1].entity.total_volume(), 88_003);
    assert!(!browser.is_quit());
}

#[tokio::test]
async fn test_preliminary_then_final_updates_in_place() {
    let dir = TempDir::new().unwrap();
    let store = InMemoryStore::new();
    let id = corn(&store);
    let preliminary = RawRow::from_cells(TableKind::VolumeAndOpenInterest, volume_row("MAY 24", "90,000"));
    IngestionService::new(&store)
        .ingest_volume_oi(id, may_3(), false, &[preliminary], FreshnessAction::Insert)
        .unwrap();
    let original_id = store.volume_oi(id, may_3()).unwrap()[0].id;

    let layout = PageLayout::default();
    let browser = FakeBrowser::new(layout.clone()).with_page(
        CORN_VOLUME,
        FakePage::new().date(
            FakeDate::new("Friday, 03 May 2024", "DATA TYPE: FINAL")
                .row(volume_row("MAY 24", "102,411")),
        ),
    );
    let finder = finder(&dir);

    let report = ScrapeOrchestrator::new(&browser, &store, &finder, &layout)
        .run(
            TableKind::VolumeAndOpenInterest,
            &[target("corn", id, CORN_VOLUME)],
        )
        .await;

    assert_eq!(report.dates_updated, 1);
    let stored = store.volume_oi(id, may_3()).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, original_id);
    assert!(stored[0].entity.is_final());
    assert_eq!(stored[0].entity.total_volume(), 102_411);
}

#[tokio::test]
async fn test_final_rows_are_never_rescraped() {
    let dir = TempDir::new().unwrap();
    let store = InMemoryStore::new();
    let id = corn(&store);
    let row = RawRow::from_cells(TableKind::VolumeAndOpenInterest, volume_row("MAY 24", "102,411"));
    IngestionService::new(&store)
        .ingest_volume_oi(id, may_3(), true, &[row], FreshnessAction::Insert)
        .unwrap();

    let layout = PageLayout::default();
    let browser = FakeBrowser::new(layout.clone()).with_page(
        CORN_VOLUME,
        FakePage::new().date(
            FakeDate::new("Friday, 03 May 2024", "DATA TYPE: PRELIMINARY")
                .row(volume_row("MAY 24", "1")),
        ),
    );
    let finder = finder(&dir);

    let report = ScrapeOrchestrator::new(&browser, &store, &finder, &layout)
        .run(
            TableKind::VolumeAndOpenInterest,
            &[target("corn", id, CORN_VOLUME)],
        )
        .await;

    assert_eq!(report.dates_skipped, 1);
    assert_eq!(report.rows_written, 0);
    assert_eq!(browser.lookups(&layout.table_rows), 0);
    assert_eq!(store.volume_oi(id, may_3()).unwrap()[0].entity.total_volume(), 102_411);
}

#[tokio::test]
async fn test_settlements_follow_last_updated() {
    let dir = TempDir::new().unwrap();
    let store = InMemoryStore::new();
    let id = corn(&store);

    let earlier = parse_last_updated("03 May 2024 05:00:00 PM CT").unwrap();
    let may_2 = TradeDate::parse_iso("2024-05-02").unwrap();
    let may_2_stamp = parse_last_updated("02 May 2024 10:32:00 PM CT").unwrap();
    for (date, stamp) in [(may_3(), earlier), (may_2, may_2_stamp)] {
        let row = RawRow::from_cells(TableKind::Settlements, settlement_row("MAY 24", "443'0"));
        store
            .create_settlement(&Settlement::from_scrape(id, date, &row, stamp).unwrap())
            .unwrap();
    }

    let layout = PageLayout::default();
    let browser = FakeBrowser::new(layout.clone()).with_page(
        CORN_SETTLEMENTS,
        FakePage::new()
            .date(
                FakeDate::new("Friday, 03 May 2024", "Last Updated: 03 May 2024 10:32:00 PM CT")
                    .row(settlement_row("MAY 24", "444'2"))
                    .row(settlement_row("JUL 24", "452'6")),
            )
            .date(
                FakeDate::new("Thursday, 02 May 2024", "Last Updated: 02 May 2024 10:32:00 PM CT")
                    .row(settlement_row("MAY 24", "999'0")),
            ),
    );
    let finder = finder(&dir);

    let report = ScrapeOrchestrator::new(&browser, &store, &finder, &layout)
        .run(TableKind::Settlements, &[target("corn", id, CORN_SETTLEMENTS)])
        .await;

    assert_eq!(report.dates_updated, 1);
    assert_eq!(report.dates_skipped, 1);
    assert_eq!(report.rows_written, 2);

    let refreshed = store.settlements(id, may_3()).unwrap();
    assert_eq!(refreshed.len(), 2);
    assert_eq!(refreshed[0].entity.settle().as_str(), "444'2");
    assert_eq!(
        store.settlement_last_updated(id, may_3()).unwrap(),
        Some(parse_last_updated("03 May 2024 10:32:00 PM CT").unwrap())
    );
    assert_eq!(store.settlements(id, may_2).unwrap()[0].entity.settle().as_str(), "443'0");
}

#[tokio::test]
async fn test_republished_settlements_without_a_month_settle_once() {
    let dir = TempDir::new().unwrap();
    let store = InMemoryStore::new();
    let id = corn(&store);
    let earlier = parse_last_updated("03 May 2024 05:00:00 PM CT").unwrap();
    for month in ["MAY 24", "JUL 24"] {
        let row = RawRow::from_cells(TableKind::Settlements, settlement_row(month, "443'0"));
        store
            .create_settlement(&Settlement::from_scrape(id, may_3(), &row, earlier).unwrap())
            .unwrap();
    }

    let layout = PageLayout::default();
    let finder = finder(&dir);
    let mut runs = Vec::new();
    for _ in 0..3 {
        let browser = FakeBrowser::new(layout.clone()).with_page(
            CORN_SETTLEMENTS,
            FakePage::new().date(
                FakeDate::new("Friday, 03 May 2024", "Last Updated: 03 May 2024 10:32:00 PM CT")
                    .row(settlement_row("MAY 24", "444'2")),
            ),
        );
        let report = ScrapeOrchestrator::new(&browser, &store, &finder, &layout)
            .run(TableKind::Settlements, &[target("corn", id, CORN_SETTLEMENTS)])
            .await;
        runs.push((report.dates_updated, report.dates_skipped, report.rows_written));
    }

    assert_eq!(runs, vec![(1, 0, 1), (0, 1, 0), (0, 1, 0)]);
    let stored = store.settlements(id, may_3()).unwrap();
    assert_eq!(stored[0].entity.settle().as_str(), "444'2");
    assert_eq!(stored[1].entity.last_updated(), earlier);
}

#[tokio::test]
async fn test_final_volume_without_a_month_completes_the_date() {
    let dir = TempDir::new().unwrap();
    let store = InMemoryStore::new();
    let id = corn(&store);
    let preliminary: Vec<RawRow> = ["MAY 24", "JUL 24"]
        .iter()
        .map(|m| RawRow::from_cells(TableKind::VolumeAndOpenInterest, volume_row(m, "90,000")))
        .collect();
    IngestionService::new(&store)
        .ingest_volume_oi(id, may_3(), false, &preliminary, FreshnessAction::Insert)
        .unwrap();

    let layout = PageLayout::default();
    let finder = finder(&dir);
    let mut runs = Vec::new();
    for _ in 0..2 {
        let browser = FakeBrowser::new(layout.clone()).with_page(
            CORN_VOLUME,
            FakePage::new().date(
                FakeDate::new("Friday, 03 May 2024", "DATA TYPE: FINAL")
                    .row(volume_row("MAY 24", "102,411")),
            ),
        );
        let report = ScrapeOrchestrator::new(&browser, &store, &finder, &layout)
            .run(
                TableKind::VolumeAndOpenInterest,
                &[target("corn", id, CORN_VOLUME)],
            )
            .await;
        runs.push((report.dates_updated, report.dates_skipped, report.rows_written));
    }

    // First run: MAY rewritten, JUL promoted.
    assert_eq!(runs, vec![(1, 0, 2), (0, 1, 0)]);
    let stored = store.volume_oi(id, may_3()).unwrap();
    assert!(stored.iter().all(|r| r.entity.is_final()));
    assert_eq!(stored[0].entity.total_volume(), 102_411);
    assert_eq!(stored[1].entity.total_volume(), 90_000);
}

#[tokio::test]
async fn test_invalid_row_rejected_rest_written() {
    let dir = TempDir::new().unwrap();
    let store = InMemoryStore::new();
    let id = corn(&store);
    let layout = PageLayout::default();
    let browser = FakeBrowser::new(layout.clone()).with_page(
        CORN_VOLUME,
        FakePage::new().date(
            FakeDate::new("Friday, 03 May 2024", "DATA TYPE: PRELIMINARY")
                .row(volume_row("MAY 24", "102,411"))
                .row(volume_row("JUL 24", "-7"))
                .row(volume_row("SEP 24", "1,2,3"))
                .row(volume_row("DEC 24", "5,090")),
        ),
    );
    let finder = finder(&dir);

    let report = ScrapeOrchestrator::new(&browser, &store, &finder, &layout)
        .run(
            TableKind::VolumeAndOpenInterest,
            &[target("corn", id, CORN_VOLUME)],
        )
        .await;

    assert_eq!(report.rows_written, 2);
    assert_eq!(report.rows_rejected, 2);
    assert!(report.failures.is_empty());
    let months: Vec<String> = store
        .volume_oi(id, may_3())
        .unwrap()
        .iter()
        .map(|r| r.entity.month().to_db_format())
        .collect();
    assert_eq!(months, vec!["2024-05", "2024-12"]);
}

#[tokio::test]
async fn test_unreadable_signal_skips_only_that_date() {
    let dir = TempDir::new().unwrap();
    let store = InMemoryStore::new();
    let id = corn(&store);
    let layout = PageLayout::default();
    let browser = FakeBrowser::new(layout.clone()).with_page(
        CORN_VOLUME,
        FakePage::new()
            .date(
                FakeDate::new("Friday, 03 May 2024", "DATA TYPE: PENDING")
                    .row(volume_row("MAY 24", "10")),
            )
            .date(
                FakeDate::new("Thursday, 02 May 2024", "DATA TYPE: FINAL")
                    .row(volume_row("MAY 24", "20")),
            ),
    );
    let finder = finder(&dir);

    let report = ScrapeOrchestrator::new(&browser, &store, &finder, &layout)
        .run(
            TableKind::VolumeAndOpenInterest,
            &[target("corn", id, CORN_VOLUME)],
        )
        .await;

    assert!(!report.is_aborted());
    assert_eq!(report.dates_seen, 2);
    assert_eq!(report.dates_inserted, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].trade_date, Some(may_3()));
    assert!(store.volume_oi(id, may_3()).unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_date_selector_aborts_run() {
    let dir = TempDir::new().unwrap();
    let store = InMemoryStore::new();
    let corn_id = corn(&store);
    let wheat_id = store.register_asset(&AssetName::new("wheat").unwrap()).unwrap();
    let soybean_id = store.register_asset(&AssetName::new("soybean").unwrap()).unwrap();

    let layout = PageLayout::default();
    // The wheat page never renders its date selector.
    let browser = FakeBrowser::new(layout.clone())
        .with_page(
            CORN_VOLUME,
            FakePage::new().date(
                FakeDate::new("Friday, 03 May 2024", "DATA TYPE: FINAL")
                    .row(volume_row("MAY 24", "10")),
            ),
        )
        .with_page(
            SOYBEAN_VOLUME,
            FakePage::new().date(
                FakeDate::new("Friday, 03 May 2024", "DATA TYPE: FINAL")
                    .row(volume_row("MAY 24", "10")),
            ),
        );
    let finder = finder(&dir);

    let report = ScrapeOrchestrator::new(&browser, &store, &finder, &layout)
        .run(
            TableKind::VolumeAndOpenInterest,
            &[
                target("corn", corn_id, CORN_VOLUME),
                target("wheat", wheat_id, WHEAT_VOLUME),
                target("soybean", soybean_id, SOYBEAN_VOLUME),
            ],
        )
        .await;

    assert!(report.is_aborted());
    assert_eq!(report.assets, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].asset, "wheat");
    assert!(browser.is_quit());
    assert_eq!(browser.navigations(), vec![CORN_VOLUME, WHEAT_VOLUME]);

    // Work done before the failure stays committed.
    assert_eq!(store.volume_oi(corn_id, may_3()).unwrap().len(), 1);
    assert!(store.volume_oi(soybean_id, may_3()).unwrap().is_empty());

    let artifacts: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(artifacts.iter().any(|f| f.starts_with("log") && f.ends_with(".txt")));
    assert!(artifacts.iter().any(|f| f.starts_with("screenshot") && f.ends_with(".png")));
}

#[tokio::test]
async fn test_application_runs_both_tables_and_writes_metrics() {
    let dir = TempDir::new().unwrap();
    let textfile = dir.path().join("metrics/cme_ingest.prom");
    let mut config = AppConfig {
        register_missing_assets: true,
        telemetry: TelemetryConfig {
            log_level: None,
            metrics_textfile: Some(textfile.clone()),
        },
        ..Default::default()
    };
    config.finder.wait_ms = 10;
    config.finder.poll_interval_ms = 2;
    config.finder.retries = 1;
    config.diagnostics.log_dir = dir.path().join("logs");
    config.assets.insert(
        "corn".to_string(),
        AssetUrls {
            settlements: CORN_SETTLEMENTS.to_string(),
            volume_and_open_interest: CORN_VOLUME.to_string(),
        },
    );

    let browser = FakeBrowser::new(config.page.clone())
        .with_page(
            CORN_SETTLEMENTS,
            FakePage::new().date(
                FakeDate::new("Friday, 03 May 2024", "03 May 2024 10:32:00 PM CT")
                    .row(settlement_row("MAY 24", "444'2")),
            ),
        )
        .with_page(
            CORN_VOLUME,
            FakePage::new().date(
                FakeDate::new("Friday, 03 May 2024", "DATA TYPE: PRELIMINARY")
                    .row(volume_row("MAY 24", "10")),
            ),
        );
    let app = Application::with_store(config, MarketDataStore::InMemory(InMemoryStore::new()));

    let reports = app
        .run_with_browser(&browser, &TableKind::ALL)
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].table, TableKind::Settlements);
    assert!(reports.iter().all(|r| r.dates_inserted == 1 && !r.is_aborted()));

    let id = app
        .store()
        .asset_id(&AssetName::new("corn").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(app.store().settlements(id, may_3()).unwrap().len(), 1);
    assert_eq!(app.store().volume_oi_is_final(id, may_3()).unwrap(), Some(false));

    let metrics = std::fs::read_to_string(&textfile).unwrap();
    assert!(metrics.contains("cme_rows_written_total"));
    assert!(metrics.contains("cme_last_run_timestamp_seconds"));
}
