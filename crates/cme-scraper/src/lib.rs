//! Browser-driven extraction of CME settlement and volume/OI tables.
//!
//! - [`Browser`]: the automation seam, implemented by [`WebDriverSession`]
//! - [`ElementFinder`]: bounded-retry lookups with fatal or best-effort escalation
//! - [`DiagnosticsWriter`]: log and screenshot capture on fatal failures
//! - [`TablePage`]: date selection, freshness label and row extraction

pub mod browser;
pub mod diagnostics;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod fake;
pub mod finder;
pub mod layout;
pub mod page;
pub mod signal;
pub mod webdriver;

pub use browser::{Browser, ElementHandle, Locator};
pub use diagnostics::{DiagnosticReport, DiagnosticsConfig, DiagnosticsWriter};
pub use error::{ScrapeError, ScrapeResult};
pub use finder::{ElementFinder, Escalation, FinderConfig};
pub use layout::PageLayout;
pub use page::TablePage;
pub use signal::{parse_finality, parse_signal};
pub use webdriver::{WebDriverConfig, WebDriverSession};
