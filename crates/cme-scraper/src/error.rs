//! Scraper error types.

use cme_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Every lookup attempt timed out. Only surfaces for best-effort lookups.
    #[error("Element not found: {locator} after {attempts} attempt(s)")]
    ElementNotFound { locator: String, attempts: u32 },

    /// A required lookup failed; the session has been torn down.
    #[error("Fatal page failure on {locator}: {cause}")]
    Fatal {
        locator: String,
        cause: String,
        log_path: Option<PathBuf>,
        screenshot_path: Option<PathBuf>,
    },

    /// WebDriver transport or protocol failure.
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Trade date not offered by the page: {0}")]
    DateUnavailable(String),

    #[error("Unrecognised freshness label: '{0}'")]
    InvalidSignal(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Short type name written to diagnostic logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::ElementNotFound { .. } => "ElementNotFound",
            ScrapeError::Fatal { .. } => "Fatal",
            ScrapeError::Browser(_) => "BrowserError",
            ScrapeError::DateUnavailable(_) => "DateUnavailable",
            ScrapeError::InvalidSignal(_) => "InvalidSignal",
            ScrapeError::Core(_) => "CoreError",
            ScrapeError::Io(_) => "IoError",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::Fatal { .. })
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        ScrapeError::Browser(e.to_string())
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
