//! Bounded-retry element discovery.
//!
//! One lookup makes up to `retries + 1` attempts. Each attempt polls the
//! page until its own deadline. A browser error (anything other than "not
//! there yet") ends the lookup immediately. When the lookup fails:
//! - [`Escalation::BestEffort`] hands the error back to the caller
//! - [`Escalation::Fatal`] captures diagnostics, quits the session and
//!   returns [`ScrapeError::Fatal`]

use crate::browser::{Browser, ElementHandle, Locator};
use crate::diagnostics::DiagnosticsWriter;
use crate::error::{ScrapeError, ScrapeResult};
use cme_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Element lookup configuration (`[finder]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderConfig {
    /// How long one attempt waits for a match (ms).
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
    /// Delay between polls within an attempt (ms).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Additional attempts after the first one times out.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_wait_ms() -> u64 {
    20_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_retries() -> u32 {
    3
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            wait_ms: default_wait_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            retries: default_retries(),
        }
    }
}

/// What to do once every attempt has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Required control: tear down the session and abort.
    Fatal,
    /// Optional control: report the miss to the caller.
    BestEffort,
}

impl Escalation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Escalation::Fatal => "fatal",
            Escalation::BestEffort => "best_effort",
        }
    }
}

enum Attempt {
    Found(Vec<ElementHandle>),
    TimedOut,
    Failed(ScrapeError),
}

/// Finds elements with bounded retries and escalation.
#[derive(Debug, Clone)]
pub struct ElementFinder {
    config: FinderConfig,
    diagnostics: DiagnosticsWriter,
}

impl ElementFinder {
    pub fn new(config: FinderConfig, diagnostics: DiagnosticsWriter) -> Self {
        Self {
            config,
            diagnostics,
        }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// All elements matching `locator`, non-empty on success.
    pub async fn find_all<B: Browser + ?Sized>(
        &self,
        browser: &B,
        locator: &Locator,
        escalation: Escalation,
    ) -> ScrapeResult<Vec<ElementHandle>> {
        let attempts = self.config.retries + 1;
        let mut failure = None;

        for attempt in 1..=attempts {
            match self.attempt(browser, locator).await {
                Attempt::Found(elements) => {
                    if attempt > 1 {
                        debug!(%locator, attempt, "Element found after retry");
                    }
                    return Ok(elements);
                }
                Attempt::TimedOut => {
                    warn!(
                        %locator,
                        attempt,
                        max_attempts = attempts,
                        wait_ms = self.config.wait_ms,
                        "Element lookup timed out"
                    );
                    Metrics::lookup_retry(escalation.as_str());
                }
                Attempt::Failed(e) => {
                    warn!(%locator, attempt, error = %e, "Element lookup failed");
                    failure = Some(e);
                    break;
                }
            }
        }

        let failure = failure.unwrap_or_else(|| ScrapeError::ElementNotFound {
            locator: locator.to_string(),
            attempts,
        });

        match escalation {
            Escalation::BestEffort => Err(failure),
            Escalation::Fatal => Err(self.escalate(browser, locator, failure).await),
        }
    }

    /// First element matching `locator`.
    pub async fn find_one<B: Browser + ?Sized>(
        &self,
        browser: &B,
        locator: &Locator,
        escalation: Escalation,
    ) -> ScrapeResult<ElementHandle> {
        let mut elements = self.find_all(browser, locator, escalation).await?;
        // find_all never returns an empty list on success.
        Ok(elements.swap_remove(0))
    }

    async fn attempt<B: Browser + ?Sized>(&self, browser: &B, locator: &Locator) -> Attempt {
        let wait = Duration::from_millis(self.config.wait_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let deadline = Instant::now() + wait;

        loop {
            match browser.find_all(locator).await {
                Ok(elements) if !elements.is_empty() => return Attempt::Found(elements),
                Ok(_) => {}
                Err(e) => return Attempt::Failed(e),
            }
            let now = Instant::now();
            if now >= deadline {
                return Attempt::TimedOut;
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }

    async fn escalate<B: Browser + ?Sized>(
        &self,
        browser: &B,
        locator: &Locator,
        failure: ScrapeError,
    ) -> ScrapeError {
        let report = match self.diagnostics.capture(browser, &failure, locator).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "Failed to capture diagnostics");
                None
            }
        };

        if let Err(e) = browser.quit().await {
            warn!(error = %e, "Browser session did not close cleanly");
        }

        error!(%locator, cause = %failure, "Required element missing, session closed");

        ScrapeError::Fatal {
            locator: locator.to_string(),
            cause: failure.to_string(),
            log_path: report.as_ref().map(|r| r.log_path.clone()),
            screenshot_path: report.and_then(|r| r.screenshot_path),
        }
    }
}
