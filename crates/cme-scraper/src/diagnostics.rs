//! Failure artifacts: a text log and a screenshot per fatal lookup.

use crate::browser::{Browser, Locator};
use crate::error::{ScrapeError, ScrapeResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Diagnostics configuration (`[diagnostics]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

/// Paths written by one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub log_path: PathBuf,
    /// `None` when the browser could not produce a screenshot.
    pub screenshot_path: Option<PathBuf>,
}

/// Writes `log<timestamp>.txt` and `screenshot<timestamp>.png` into a directory.
///
/// Timestamps carry milliseconds; a capture that still lands on an existing
/// stamp gets a numeric suffix.
#[derive(Debug, Clone)]
pub struct DiagnosticsWriter {
    log_dir: PathBuf,
}

impl DiagnosticsWriter {
    pub fn new(config: &DiagnosticsConfig) -> Self {
        Self {
            log_dir: config.log_dir.clone(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    fn unused_stamp(&self, base: String) -> String {
        let mut stamp = base.clone();
        let mut n = 0;
        while self.log_dir.join(format!("log{stamp}.txt")).exists() {
            n += 1;
            stamp = format!("{base}_{n}");
        }
        stamp
    }

    /// Capture the failure context.
    ///
    /// Browser calls made here are themselves allowed to fail: the log file
    /// is still written with whatever could be collected.
    pub async fn capture<B: Browser + ?Sized>(
        &self,
        browser: &B,
        failure: &ScrapeError,
        locator: &Locator,
    ) -> ScrapeResult<DiagnosticReport> {
        std::fs::create_dir_all(&self.log_dir)?;

        let now = Utc::now();
        let stamp = self.unused_stamp(now.format("%Y%m%d_%H%M%S_%3f").to_string());
        let url = match browser.current_url().await {
            Ok(url) => url,
            Err(e) => format!("<unavailable: {e}>"),
        };

        let log_path = self.log_dir.join(format!("log{stamp}.txt"));
        let body = format!(
            "Error Type: {}\nError Message: {}\nStack Trace:\n{}\nTime: {}\nURL: {}\nLocator: {}\n",
            failure.kind(),
            failure,
            Backtrace::force_capture(),
            now.to_rfc3339(),
            url,
            locator,
        );
        std::fs::write(&log_path, body)?;

        let screenshot_path = match browser.screenshot_png().await {
            Ok(png) => {
                let path = self.log_dir.join(format!("screenshot{stamp}.png"));
                match std::fs::write(&path, png) {
                    Ok(()) => Some(path),
                    Err(e) => {
                        warn!(error = %e, "Failed to write screenshot");
                        None
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to take screenshot");
                None
            }
        };

        error!(
            log = %log_path.display(),
            screenshot = ?screenshot_path,
            %locator,
            url = %url,
            "Captured diagnostics"
        );

        Ok(DiagnosticReport {
            log_path,
            screenshot_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBrowser;
    use crate::layout::PageLayout;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_back_to_back_captures_keep_both_artifacts() {
        let dir = TempDir::new().unwrap();
        let writer = DiagnosticsWriter::new(&DiagnosticsConfig {
            log_dir: dir.path().to_path_buf(),
        });
        let browser = FakeBrowser::new(PageLayout::default());
        let failure = ScrapeError::Browser("stale element".to_string());
        let locator = Locator::css("#dates");

        let first = writer.capture(&browser, &failure, &locator).await.unwrap();
        let second = writer.capture(&browser, &failure, &locator).await.unwrap();

        assert_ne!(first.log_path, second.log_path);
        assert_ne!(first.screenshot_path, second.screenshot_path);
        assert!(first.log_path.exists() && second.log_path.exists());
        let name = first.log_path.file_name().unwrap().to_string_lossy().into_owned();
        // log + YYYYmmdd_HHMMSS_mmm + .txt
        assert!(name.len() >= "log20240503_223200_000.txt".len(), "{name}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 4);
    }
}
