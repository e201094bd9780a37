//! Scripted in-memory browser for tests.
//!
//! Models the table pages as the [`PageLayout`] locators see them: a date
//! menu whose entries only show text while open, a freshness label, an
//! optional "load all" control and the table rows of the selected date.

use crate::browser::{Browser, ElementHandle, Locator};
use crate::error::{ScrapeError, ScrapeResult};
use crate::layout::PageLayout;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// PNG signature, enough for screenshot plumbing.
const FAKE_PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// One trade date as published on a fake page.
#[derive(Debug, Clone)]
pub struct FakeDate {
    label: String,
    signal: String,
    rows: Vec<Vec<String>>,
    collapsed: bool,
}

impl FakeDate {
    pub fn new(label: impl Into<String>, signal: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            signal: signal.into(),
            rows: Vec::new(),
            collapsed: false,
        }
    }

    pub fn row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    /// Only the first row is shown until "load all" is clicked.
    pub fn collapsed(mut self) -> Self {
        self.collapsed = true;
        self
    }
}

/// A fake table page.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    dates: Vec<FakeDate>,
    extra_entries: Vec<String>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date(mut self, date: FakeDate) -> Self {
        self.dates.push(date);
        self
    }

    /// A menu entry that is not a trade date.
    pub fn entry(mut self, label: impl Into<String>) -> Self {
        self.extra_entries.push(label.into());
        self
    }

    fn menu_labels(&self) -> impl Iterator<Item = &str> {
        self.dates
            .iter()
            .map(|d| d.label.as_str())
            .chain(self.extra_entries.iter().map(String::as_str))
    }
}

#[derive(Default)]
struct FakeState {
    pages: HashMap<String, FakePage>,
    current_url: Option<String>,
    selected: usize,
    menu_open: bool,
    expanded: bool,
    quit: bool,
    hidden: HashSet<Locator>,
    broken: HashSet<Locator>,
    delays: HashMap<Locator, u32>,
    lookups: HashMap<Locator, u32>,
    navigations: Vec<String>,
}

impl FakeState {
    fn page(&self) -> Option<&FakePage> {
        self.current_url.as_ref().and_then(|url| self.pages.get(url))
    }

    fn date(&self) -> Option<&FakeDate> {
        self.page().and_then(|p| p.dates.get(self.selected))
    }

    fn visible_rows(&self) -> usize {
        match self.date() {
            Some(d) if d.collapsed && !self.expanded => d.rows.len().min(1),
            Some(d) => d.rows.len(),
            None => 0,
        }
    }
}

/// In-memory [`Browser`].
pub struct FakeBrowser {
    layout: PageLayout,
    state: Mutex<FakeState>,
}

impl FakeBrowser {
    pub fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_page(self, url: impl Into<String>, page: FakePage) -> Self {
        self.state.lock().pages.insert(url.into(), page);
        self
    }

    /// The locator never matches.
    pub fn hide(&self, locator: &Locator) {
        self.state.lock().hidden.insert(locator.clone());
    }

    /// Lookups of the locator fail with a browser error.
    pub fn break_locator(&self, locator: &Locator) {
        self.state.lock().broken.insert(locator.clone());
    }

    /// The locator matches nothing for its first `lookups` lookups.
    pub fn delay(&self, locator: &Locator, lookups: u32) {
        self.state.lock().delays.insert(locator.clone(), lookups);
    }

    pub fn lookups(&self, locator: &Locator) -> u32 {
        self.state.lock().lookups.get(locator).copied().unwrap_or(0)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn is_quit(&self) -> bool {
        self.state.lock().quit
    }

    pub fn menu_open(&self) -> bool {
        self.state.lock().menu_open
    }

    fn live(state: &FakeState) -> ScrapeResult<()> {
        if state.quit {
            Err(ScrapeError::Browser("session closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn handles(prefix: &str, count: usize) -> Vec<ElementHandle> {
        (0..count)
            .map(|i| ElementHandle(format!("{prefix}:{i}")))
            .collect()
    }
}

fn index(handle: &ElementHandle, prefix: &str) -> Option<usize> {
    handle.0.strip_prefix(prefix)?.strip_prefix(':')?.parse().ok()
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&self, url: &str) -> ScrapeResult<()> {
        let mut state = self.state.lock();
        Self::live(&state)?;
        state.navigations.push(url.to_string());
        state.current_url = Some(url.to_string());
        state.selected = 0;
        state.menu_open = false;
        state.expanded = false;
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> ScrapeResult<Vec<ElementHandle>> {
        let mut state = self.state.lock();
        Self::live(&state)?;
        let seen = {
            let count = state.lookups.entry(locator.clone()).or_insert(0);
            *count += 1;
            *count
        };

        if state.broken.contains(locator) {
            return Err(ScrapeError::Browser(format!("stale element reference: {locator}")));
        }
        if state.hidden.contains(locator) {
            return Ok(Vec::new());
        }
        if state.delays.get(locator).is_some_and(|d| seen <= *d) {
            return Ok(Vec::new());
        }
        let Some(page) = state.page() else {
            return Ok(Vec::new());
        };

        let layout = &self.layout;
        let found = if *locator == layout.date_toggle {
            vec![ElementHandle("toggle".to_string())]
        } else if *locator == layout.date_options {
            Self::handles("option", page.menu_labels().count())
        } else if *locator == layout.last_updated_label || *locator == layout.final_label {
            if state.date().is_some() {
                vec![ElementHandle("signal".to_string())]
            } else {
                Vec::new()
            }
        } else if *locator == layout.load_all {
            match state.date() {
                Some(d) if d.collapsed && !state.expanded => {
                    vec![ElementHandle("load_all".to_string())]
                }
                _ => Vec::new(),
            }
        } else if *locator == layout.table_rows {
            Self::handles("row", state.visible_rows())
        } else {
            Vec::new()
        };
        Ok(found)
    }

    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> ScrapeResult<Vec<ElementHandle>> {
        let state = self.state.lock();
        Self::live(&state)?;
        if *locator != self.layout.row_cells {
            return Ok(Vec::new());
        }
        let row = index(parent, "row")
            .ok_or_else(|| ScrapeError::Browser(format!("not a row: {}", parent.0)))?;
        let width = state
            .date()
            .and_then(|d| d.rows.get(row))
            .map(Vec::len)
            .unwrap_or(0);
        Ok((0..width)
            .map(|c| ElementHandle(format!("cell:{row}:{c}")))
            .collect())
    }

    async fn text(&self, element: &ElementHandle) -> ScrapeResult<String> {
        let state = self.state.lock();
        Self::live(&state)?;
        let stale = || ScrapeError::Browser(format!("stale element reference: {}", element.0));

        if element.0 == "toggle" {
            return Ok("Trade date".to_string());
        }
        if element.0 == "signal" {
            return state.date().map(|d| d.signal.clone()).ok_or_else(stale);
        }
        if let Some(i) = index(element, "option") {
            if !state.menu_open {
                return Ok(String::new());
            }
            return state
                .page()
                .and_then(|p| p.menu_labels().nth(i))
                .map(str::to_string)
                .ok_or_else(stale);
        }
        if let Some(rest) = element.0.strip_prefix("cell:") {
            let (row, col) = rest.split_once(':').ok_or_else(stale)?;
            let (row, col): (usize, usize) = (
                row.parse().map_err(|_| stale())?,
                col.parse().map_err(|_| stale())?,
            );
            return state
                .date()
                .and_then(|d| d.rows.get(row))
                .and_then(|r| r.get(col))
                .cloned()
                .ok_or_else(stale);
        }
        Err(stale())
    }

    async fn click(&self, element: &ElementHandle) -> ScrapeResult<()> {
        let mut state = self.state.lock();
        Self::live(&state)?;

        if element.0 == "toggle" {
            state.menu_open = !state.menu_open;
        } else if element.0 == "load_all" {
            state.expanded = true;
        } else if let Some(i) = index(element, "option") {
            let dates = state.page().map(|p| p.dates.len()).unwrap_or(0);
            if i < dates {
                state.selected = i;
                state.expanded = false;
            }
            state.menu_open = false;
        }
        Ok(())
    }

    async fn current_url(&self) -> ScrapeResult<String> {
        let state = self.state.lock();
        Self::live(&state)?;
        Ok(state.current_url.clone().unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn screenshot_png(&self) -> ScrapeResult<Vec<u8>> {
        let state = self.state.lock();
        Self::live(&state)?;
        Ok(FAKE_PNG.to_vec())
    }

    async fn quit(&self) -> ScrapeResult<()> {
        self.state.lock().quit = true;
        Ok(())
    }
}
