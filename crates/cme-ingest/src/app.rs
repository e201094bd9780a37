//! Application wiring: store, browser session, orchestrator runs.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::orchestrator::{AssetTarget, ScrapeOrchestrator};
use crate::report::RunReport;
use cme_core::{Asset, AssetName, TableKind};
use cme_persistence::{AssetDirectory, MarketDataStore};
use cme_scraper::{Browser, DiagnosticsWriter, ElementFinder, WebDriverSession};
use cme_telemetry::Metrics;
use tracing::{info, warn};

pub struct Application {
    config: AppConfig,
    store: MarketDataStore,
    finder: ElementFinder,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let store = MarketDataStore::open(&config.store)?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: AppConfig, store: MarketDataStore) -> Self {
        let finder = ElementFinder::new(
            config.finder.clone(),
            DiagnosticsWriter::new(&config.diagnostics),
        );
        Self {
            config,
            store,
            finder,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &MarketDataStore {
        &self.store
    }

    /// Register every configured asset. Existing entries are kept.
    pub fn init_assets(&self) -> AppResult<Vec<Asset>> {
        let mut registered = Vec::new();
        for name in self.config.asset_urls()?.into_keys() {
            let id = self.store.register_asset(&name)?;
            info!(asset = %name, %id, "Asset registered");
            registered.push(Asset::new(id, name));
        }
        Ok(registered)
    }

    /// Drop an asset and all of its stored rows.
    pub fn remove_asset(&self, name: &str) -> AppResult<bool> {
        let name = AssetName::new(name)?;
        let removed = self.store.remove_asset(&name)?;
        if removed {
            info!(asset = %name, "Asset removed");
        } else {
            warn!(asset = %name, "Asset not registered");
        }
        Ok(removed)
    }

    /// Configured assets that have a directory entry, with the page URL
    /// for `kind`.
    pub fn targets(&self, kind: TableKind) -> AppResult<Vec<AssetTarget>> {
        let mut targets = Vec::new();
        for (name, urls) in self.config.asset_urls()? {
            let asset_id = if self.config.register_missing_assets {
                self.store.register_asset(&name)?
            } else {
                match self.store.asset_id(&name)? {
                    Some(id) => id,
                    None => {
                        warn!(asset = %name, "Asset not registered, skipping");
                        continue;
                    }
                }
            };
            targets.push(AssetTarget {
                url: urls.url(kind).to_string(),
                name,
                asset_id,
            });
        }
        Ok(targets)
    }

    /// Scrape `kinds` in order with a fresh WebDriver session.
    pub async fn run(&self, kinds: &[TableKind]) -> AppResult<Vec<RunReport>> {
        let session = WebDriverSession::start(&self.config.webdriver).await?;
        let result = self.run_with_browser(&session, kinds).await;
        if let Err(e) = session.quit().await {
            warn!(error = %e, "Browser session did not close cleanly");
        }
        result
    }

    /// Scrape `kinds` in order through `browser`. Stops after a run that
    /// aborted, since the session is gone.
    pub async fn run_with_browser<B: Browser + ?Sized>(
        &self,
        browser: &B,
        kinds: &[TableKind],
    ) -> AppResult<Vec<RunReport>> {
        let orchestrator =
            ScrapeOrchestrator::new(browser, &self.store, &self.finder, &self.config.page);

        let mut reports = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let targets = self.targets(kind)?;
            info!(table = %kind, assets = targets.len(), "Starting run");
            let report = orchestrator.run(kind, &targets).await;
            report.log();
            let aborted = report.is_aborted();
            reports.push(report);
            if aborted {
                break;
            }
        }

        Metrics::run_finished();
        if let Some(path) = &self.config.telemetry.metrics_textfile {
            match Metrics::write_textfile(path) {
                Ok(()) => info!(path = %path.display(), "Metrics written"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to write metrics"),
            }
        }
        Ok(reports)
    }
}
