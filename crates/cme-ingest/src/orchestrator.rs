//! Walks every asset and downloadable date of one table.
//!
//! Per date: select, read the freshness signal, reconcile, and only then
//! expand and extract the table. Failures local to a date or an asset are
//! recorded and the walk goes on. A fatal page failure has already closed
//! the browser session, so it ends the run.

use crate::error::{AppError, AppResult};
use crate::reconciler::FreshnessReconciler;
use crate::report::RunReport;
use crate::service::{IngestOutcome, IngestionService};
use cme_core::{AssetId, AssetName, FreshnessAction, TableKind, TradeDate};
use cme_persistence::MarketDataRepository;
use cme_scraper::{Browser, ElementFinder, PageLayout, ScrapeError, TablePage};
use cme_telemetry::Metrics;
use tracing::{error, info, warn};

/// One asset page to scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTarget {
    pub name: AssetName,
    pub asset_id: AssetId,
    pub url: String,
}

/// Drives one browser session over a list of asset pages.
pub struct ScrapeOrchestrator<'a, B, S>
where
    B: Browser + ?Sized,
    S: MarketDataRepository + ?Sized,
{
    browser: &'a B,
    store: &'a S,
    finder: &'a ElementFinder,
    layout: &'a PageLayout,
}

impl<'a, B, S> ScrapeOrchestrator<'a, B, S>
where
    B: Browser + ?Sized,
    S: MarketDataRepository + ?Sized,
{
    pub fn new(
        browser: &'a B,
        store: &'a S,
        finder: &'a ElementFinder,
        layout: &'a PageLayout,
    ) -> Self {
        Self {
            browser,
            store,
            finder,
            layout,
        }
    }

    /// Scrape `kind` for every target, in order.
    pub async fn run(&self, kind: TableKind, targets: &[AssetTarget]) -> RunReport {
        let mut report = RunReport::new(kind);
        let page = TablePage::new(self.browser, self.finder, self.layout, kind);

        for target in targets {
            report.assets += 1;
            match self.scrape_asset(&page, target, &mut report).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    error!(table = %kind, asset = %target.name, error = %e, "Aborting run");
                    Metrics::fatal_abort();
                    report.record_failure(target.name.as_str(), None, &e);
                    report.aborted = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    warn!(table = %kind, asset = %target.name, error = %e, "Asset skipped");
                    report.record_failure(target.name.as_str(), None, &e);
                }
            }
        }
        report
    }

    async fn scrape_asset(
        &self,
        page: &TablePage<'_, B>,
        target: &AssetTarget,
        report: &mut RunReport,
    ) -> AppResult<()> {
        page.open(&target.url).await?;
        let dates = page.downloadable_dates().await?;
        info!(table = %page.kind(), asset = %target.name, dates = dates.len(), "Processing asset");

        for date in dates {
            report.dates_seen += 1;
            match self.process_date(page, target, date).await {
                Ok((action, outcome)) => {
                    report.record_action(action);
                    report.rows_written += outcome.written;
                    report.rows_rejected += outcome.rejected;
                    report.rows_unchanged += outcome.unchanged;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let outcome = match &e {
                        AppError::Scrape(ScrapeError::DateUnavailable(_)) => "unavailable",
                        _ => "error",
                    };
                    Metrics::date_outcome(page.kind().as_str(), outcome);
                    match &e {
                        AppError::Ingest(ingest) => {
                            report.rows_written += ingest.committed();
                            report.persistence_failures += 1;
                        }
                        AppError::Persistence(_) => report.persistence_failures += 1,
                        _ => {}
                    }
                    warn!(
                        table = %page.kind(),
                        asset = %target.name,
                        trade_date = %date,
                        error = %e,
                        "Trade date skipped"
                    );
                    report.record_failure(target.name.as_str(), Some(date), &e);
                }
            }
        }
        Ok(())
    }

    async fn process_date(
        &self,
        page: &TablePage<'_, B>,
        target: &AssetTarget,
        date: TradeDate,
    ) -> AppResult<(FreshnessAction, IngestOutcome)> {
        let kind = page.kind();
        page.select_date(date).await?;
        let signal = page.freshness_signal().await?;

        let action = FreshnessReconciler::new(self.store).decide(target.asset_id, date, signal)?;
        Metrics::date_outcome(kind.as_str(), action.as_str());
        if action == FreshnessAction::Skip {
            info!(table = %kind, asset = %target.name, trade_date = %date, %signal, "Up to date");
            return Ok((action, IngestOutcome::default()));
        }

        page.expand_all().await?;
        let rows = page.extract_rows().await?;
        let outcome = IngestionService::new(self.store).ingest(
            target.asset_id,
            date,
            signal,
            &rows,
            action,
        )?;

        info!(
            table = %kind,
            asset = %target.name,
            trade_date = %date,
            %action,
            rows = rows.len(),
            written = outcome.written,
            rejected = outcome.rejected,
            unchanged = outcome.unchanged,
            "Trade date ingested"
        );
        Ok((action, outcome))
    }
}
