//! Application configuration.

use crate::error::{AppError, AppResult};
use cme_core::{AssetName, TableKind};
use cme_persistence::StoreConfig;
use cme_scraper::{DiagnosticsConfig, FinderConfig, PageLayout, WebDriverConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Page URLs of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUrls {
    pub settlements: String,
    pub volume_and_open_interest: String,
}

impl AssetUrls {
    pub fn url(&self, kind: TableKind) -> &str {
        match kind {
            TableKind::Settlements => &self.settlements,
            TableKind::VolumeAndOpenInterest => &self.volume_and_open_interest,
        }
    }
}

/// Logging and metrics output (`[telemetry]` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Prometheus textfile written at the end of every run.
    #[serde(default)]
    pub metrics_textfile: Option<PathBuf>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub webdriver: WebDriverConfig,
    #[serde(default)]
    pub finder: FinderConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub page: PageLayout,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Create directory entries for configured assets that are not yet
    /// registered. When off, such assets are skipped.
    #[serde(default)]
    pub register_missing_assets: bool,
    /// JSON file mapping asset names to their page URLs.
    #[serde(default)]
    pub urls_file: Option<PathBuf>,
    /// Inline asset URLs. These win over entries of `urls_file`.
    #[serde(default)]
    pub assets: BTreeMap<String, AssetUrls>,
}

impl AppConfig {
    /// Load from a specific file.
    ///
    /// A relative `urls_file` is resolved against the config file's directory.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let mut config = Self::from_toml_str(&content)?;
        if let (Some(urls), Some(dir)) = (config.urls_file.as_mut(), Path::new(path).parent()) {
            if urls.is_relative() {
                *urls = dir.join(&*urls);
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Every configured asset with its URLs.
    pub fn asset_urls(&self) -> AppResult<BTreeMap<AssetName, AssetUrls>> {
        let mut merged = match &self.urls_file {
            Some(path) => load_urls_file(path)?,
            None => BTreeMap::new(),
        };
        merged.extend(self.assets.iter().map(|(k, v)| (k.clone(), v.clone())));

        merged
            .into_iter()
            .map(|(name, urls)| {
                let name = AssetName::new(name.as_str())
                    .map_err(|e| AppError::Config(format!("Bad asset name '{name}': {e}")))?;
                Ok((name, urls))
            })
            .collect()
    }
}

fn load_urls_file(path: &Path) -> AppResult<BTreeMap<String, AssetUrls>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read urls file {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        AppError::Config(format!("Failed to parse urls file {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cme_persistence::StoreKind;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.store.kind, StoreKind::Sqlite);
        assert_eq!(config.finder.retries, 3);
        assert_eq!(config.webdriver.url, "http://localhost:9515");
        assert!(!config.register_missing_assets);
        assert!(config.asset_urls().unwrap().is_empty());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            register_missing_assets = true

            [store]
            kind = "memory"

            [finder]
            wait_ms = 100
            retries = 0

            [page]
            load_all = { css = "button.show-all" }

            [assets.corn]
            settlements = "https://example.test/corn/settlements"
            volume_and_open_interest = "https://example.test/corn/volume"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.finder.wait_ms, 100);
        assert_eq!(config.finder.poll_interval_ms, 500);
        assert_eq!(config.finder.retries, 0);
        assert_eq!(config.page.load_all.value(), "button.show-all");
        assert!(config.register_missing_assets);

        let urls = config.asset_urls().unwrap();
        let corn = &urls[&AssetName::new("corn").unwrap()];
        assert_eq!(
            corn.url(TableKind::VolumeAndOpenInterest),
            "https://example.test/corn/volume"
        );
    }

    #[test]
    fn test_urls_file_merged_inline_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("urls.json"),
            r#"{
                "corn": {"settlements": "file/corn/s", "volume_and_open_interest": "file/corn/v"},
                "wheat": {"settlements": "file/wheat/s", "volume_and_open_interest": "file/wheat/v"}
            }"#,
        )
        .unwrap();
        let config_path = dir.path().join("ingest.toml");
        std::fs::write(
            &config_path,
            r#"
            urls_file = "urls.json"

            [assets.corn]
            settlements = "inline/corn/s"
            volume_and_open_interest = "inline/corn/v"
            "#,
        )
        .unwrap();

        let config = AppConfig::from_file(config_path.to_str().unwrap()).unwrap();
        let urls = config.asset_urls().unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[&AssetName::new("corn").unwrap()].settlements, "inline/corn/s");
        assert_eq!(urls[&AssetName::new("wheat").unwrap()].settlements, "file/wheat/s");
    }

    #[test]
    fn test_missing_urls_file_is_config_error() {
        let config = AppConfig {
            urls_file: Some(PathBuf::from("/nonexistent/urls.json")),
            ..Default::default()
        };
        assert!(matches!(config.asset_urls(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_unparseable_config() {
        assert!(matches!(
            AppConfig::from_toml_str("[store]\nkind = \"postgres\""),
            Err(AppError::Config(_))
        ));
    }
}
