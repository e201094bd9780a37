//! Browser automation seam.

use crate::error::ScrapeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural locator for page elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    /// W3C WebDriver location strategy.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// Opaque reference to an element in the live page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

/// Minimal browser surface the scraper needs.
///
/// `find_all` returns an empty list when nothing matches yet; waiting and
/// retrying belong to [`crate::ElementFinder`].
#[async_trait]
pub trait Browser: Send + Sync {
    async fn navigate(&self, url: &str) -> ScrapeResult<()>;

    async fn find_all(&self, locator: &Locator) -> ScrapeResult<Vec<ElementHandle>>;

    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> ScrapeResult<Vec<ElementHandle>>;

    async fn text(&self, element: &ElementHandle) -> ScrapeResult<String>;

    async fn click(&self, element: &ElementHandle) -> ScrapeResult<()>;

    async fn current_url(&self) -> ScrapeResult<String>;

    /// PNG bytes of the current viewport.
    async fn screenshot_png(&self) -> ScrapeResult<Vec<u8>>;

    /// End the session. Later calls fail.
    async fn quit(&self) -> ScrapeResult<()>;
}
