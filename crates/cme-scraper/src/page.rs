//! Page object for one table page (settlements or volume/OI) of one asset.

use crate::browser::{Browser, ElementHandle};
use crate::error::{ScrapeError, ScrapeResult};
use crate::finder::{ElementFinder, Escalation};
use crate::layout::PageLayout;
use crate::signal::parse_signal;
use cme_core::{FreshnessSignal, RawRow, TableKind, TradeDate};
use tracing::{debug, info, warn};

/// Drives a single table page through a shared browser session.
pub struct TablePage<'a, B: Browser + ?Sized> {
    browser: &'a B,
    finder: &'a ElementFinder,
    layout: &'a PageLayout,
    kind: TableKind,
}

impl<'a, B: Browser + ?Sized> TablePage<'a, B> {
    pub fn new(
        browser: &'a B,
        finder: &'a ElementFinder,
        layout: &'a PageLayout,
        kind: TableKind,
    ) -> Self {
        Self {
            browser,
            finder,
            layout,
            kind,
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Navigate to the listing and wait for the date selector.
    pub async fn open(&self, url: &str) -> ScrapeResult<()> {
        info!(table = %self.kind, url, "Opening table page");
        self.browser.navigate(url).await?;
        self.finder
            .find_one(self.browser, &self.layout.date_toggle, Escalation::Fatal)
            .await?;
        Ok(())
    }

    /// Open the date menu and return its entries with their labels.
    async fn date_menu(&self) -> ScrapeResult<Vec<(ElementHandle, String)>> {
        let toggle = self
            .finder
            .find_one(self.browser, &self.layout.date_toggle, Escalation::Fatal)
            .await?;
        self.browser.click(&toggle).await?;

        let options = self
            .finder
            .find_all(self.browser, &self.layout.date_options, Escalation::Fatal)
            .await?;
        let mut entries = Vec::with_capacity(options.len());
        for option in options {
            let label = self.browser.text(&option).await?;
            entries.push((option, label.trim().to_string()));
        }
        Ok(entries)
    }

    async fn close_date_menu(&self) -> ScrapeResult<()> {
        let toggle = self
            .finder
            .find_one(self.browser, &self.layout.date_toggle, Escalation::Fatal)
            .await?;
        self.browser.click(&toggle).await
    }

    /// Trade dates offered by the date selector, in page order.
    ///
    /// Entries whose label is not a trade date are logged and ignored.
    pub async fn downloadable_dates(&self) -> ScrapeResult<Vec<TradeDate>> {
        let entries = self.date_menu().await?;
        self.close_date_menu().await?;

        let mut dates = Vec::with_capacity(entries.len());
        for (_, label) in entries {
            match TradeDate::from_string(&label) {
                Ok(date) => dates.push(date),
                Err(e) => warn!(table = %self.kind, label = %label, error = %e, "Skipping date entry"),
            }
        }
        debug!(table = %self.kind, count = dates.len(), "Found downloadable dates");
        Ok(dates)
    }

    /// Select a trade date in the menu.
    ///
    /// Returns [`ScrapeError::DateUnavailable`] when the menu no longer
    /// offers it.
    pub async fn select_date(&self, date: TradeDate) -> ScrapeResult<()> {
        let entries = self.date_menu().await?;
        let target = entries
            .into_iter()
            .find(|(_, label)| TradeDate::from_string(label).ok() == Some(date));

        match target {
            Some((option, _)) => {
                self.browser.click(&option).await?;
                debug!(table = %self.kind, trade_date = %date, "Selected trade date");
                Ok(())
            }
            None => {
                self.close_date_menu().await?;
                Err(ScrapeError::DateUnavailable(date.to_label()))
            }
        }
    }

    /// Read the freshness signal of the selected date.
    pub async fn freshness_signal(&self) -> ScrapeResult<FreshnessSignal> {
        let label = self
            .finder
            .find_one(
                self.browser,
                self.layout.signal_label(self.kind),
                Escalation::Fatal,
            )
            .await?;
        let text = self.browser.text(&label).await?;
        parse_signal(self.kind, text.trim())
    }

    /// Click "load all" when present. Returns whether it was clicked.
    pub async fn expand_all(&self) -> ScrapeResult<bool> {
        match self
            .finder
            .find_one(self.browser, &self.layout.load_all, Escalation::BestEffort)
            .await
        {
            Ok(button) => {
                self.browser.click(&button).await?;
                Ok(true)
            }
            Err(ScrapeError::ElementNotFound { .. }) => {
                debug!(table = %self.kind, "No load-all control");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Read the rendered table positionally into the fixed schema.
    ///
    /// A page without rows yields an empty list.
    pub async fn extract_rows(&self) -> ScrapeResult<Vec<RawRow>> {
        let rows = match self
            .finder
            .find_all(self.browser, &self.layout.table_rows, Escalation::BestEffort)
            .await
        {
            Ok(rows) => rows,
            Err(ScrapeError::ElementNotFound { .. }) => {
                warn!(table = %self.kind, "Table has no rows");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let cells = self
                .browser
                .find_all_within(row, &self.layout.row_cells)
                .await?;
            let mut texts = Vec::with_capacity(cells.len());
            for cell in &cells {
                texts.push(self.browser.text(cell).await?);
            }
            let raw = RawRow::from_cells(self.kind, &texts);
            if cells.len() < self.kind.columns().len() {
                debug!(table = %self.kind, cells = cells.len(), "Short row padded with nulls");
            }
            out.push(raw);
        }
        Ok(out)
    }
}
