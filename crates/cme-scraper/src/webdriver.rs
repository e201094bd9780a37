//! W3C WebDriver session over HTTP.
//!
//! Talks to a running driver server (chromedriver or a Selenium grid) using
//! the JSON wire format from the W3C WebDriver recommendation.

use crate::browser::{Browser, ElementHandle, Locator};
use crate::error::{ScrapeError, ScrapeResult};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver configuration (`[webdriver]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDriverConfig {
    /// Driver server URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Run Chrome without a window.
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Chrome command-line switches, `--headless` is added when enabled.
    #[serde(default = "default_browser_args")]
    pub browser_args: Vec<String>,
    /// Driver-side implicit wait applied to element lookups (ms).
    #[serde(default = "default_implicit_wait_ms")]
    pub implicit_wait_ms: u64,
    /// HTTP timeout for a single driver command (seconds).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_browser_args() -> Vec<String> {
    [
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--disable-extensions",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_implicit_wait_ms() -> u64 {
    3_000
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            headless: default_headless(),
            browser_args: default_browser_args(),
            implicit_wait_ms: default_implicit_wait_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WebDriverConfig {
    /// Capabilities payload for `POST /session`.
    pub fn capabilities(&self) -> Value {
        let mut args = self.browser_args.clone();
        if self.headless && !args.iter().any(|a| a.starts_with("--headless")) {
            args.push("--headless".to_string());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args },
                    "timeouts": { "implicit": self.implicit_wait_ms }
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

/// A live WebDriver session.
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
    closed: AtomicBool,
}

impl WebDriverSession {
    /// Create a new browser session.
    pub async fn start(config: &WebDriverConfig) -> ScrapeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ScrapeError::Browser(format!("Failed to create HTTP client: {e}")))?;
        let base_url = config.url.trim_end_matches('/').to_string();

        let value = send(
            &client,
            Method::POST,
            &format!("{base_url}/session"),
            Some(config.capabilities()),
        )
        .await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ScrapeError::Browser(format!("No sessionId in response: {value}")))?
            .to_string();

        info!(driver = %base_url, session_id = %session_id, headless = config.headless, "WebDriver session started");

        Ok(Self {
            client,
            base_url,
            session_id,
            closed: AtomicBool::new(false),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> ScrapeResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScrapeError::Browser("session already closed".to_string()));
        }
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        send(&self.client, method, &url, body).await
    }
}

async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> ScrapeResult<Value> {
    debug!(%method, url, "WebDriver command");
    let request = client.request(method, url);
    let request = match body {
        Some(body) => request.json(&body),
        None => request,
    };
    let response = request.send().await?;
    let status = response.status();
    let wire: WireResponse = response.json().await?;

    if !status.is_success() {
        return Err(ScrapeError::Browser(wire_error(status.as_u16(), &wire.value)));
    }
    Ok(wire.value)
}

fn wire_error(status: u16, value: &Value) -> String {
    let error = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");
    format!("HTTP {status}: {error}: {message}")
}

/// Pull element references out of a find-elements response.
fn element_handles(value: &Value) -> ScrapeResult<Vec<ElementHandle>> {
    let items = value
        .as_array()
        .ok_or_else(|| ScrapeError::Browser(format!("Expected element list, got {value}")))?;
    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|id| ElementHandle(id.to_string()))
                .ok_or_else(|| ScrapeError::Browser(format!("Malformed element reference: {item}")))
        })
        .collect()
}

fn locator_body(locator: &Locator) -> Value {
    json!({ "using": locator.strategy(), "value": locator.value() })
}

fn string_value(value: Value) -> ScrapeResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ScrapeError::Browser(format!("Expected string, got {other}"))),
    }
}

#[async_trait]
impl Browser for WebDriverSession {
    async fn navigate(&self, url: &str) -> ScrapeResult<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn find_all(&self, locator: &Locator) -> ScrapeResult<Vec<ElementHandle>> {
        let value = self
            .command(Method::POST, "/elements", Some(locator_body(locator)))
            .await?;
        element_handles(&value)
    }

    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> ScrapeResult<Vec<ElementHandle>> {
        let value = self
            .command(
                Method::POST,
                &format!("/element/{}/elements", parent.0),
                Some(locator_body(locator)),
            )
            .await?;
        element_handles(&value)
    }

    async fn text(&self, element: &ElementHandle) -> ScrapeResult<String> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.0), None)
            .await?;
        string_value(value)
    }

    async fn click(&self, element: &ElementHandle) -> ScrapeResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.0),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    async fn current_url(&self) -> ScrapeResult<String> {
        string_value(self.command(Method::GET, "/url", None).await?)
    }

    async fn screenshot_png(&self) -> ScrapeResult<Vec<u8>> {
        let encoded = string_value(self.command(Method::GET, "/screenshot", None).await?)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| ScrapeError::Browser(format!("Screenshot is not base64: {e}")))
    }

    async fn quit(&self) -> ScrapeResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        match send(&self.client, Method::DELETE, &url, None).await {
            Ok(_) => {
                info!(session_id = %self.session_id, "WebDriver session closed");
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Failed to close WebDriver session");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_add_headless() {
        let caps = WebDriverConfig::default().capabilities();
        let args = caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap();
        assert!(args.iter().any(|a| a == "--headless"));
        assert!(args.iter().any(|a| a == "--no-sandbox"));
        assert_eq!(
            caps["capabilities"]["alwaysMatch"]["timeouts"]["implicit"],
            3_000
        );
    }

    #[test]
    fn test_capabilities_headed() {
        let config = WebDriverConfig {
            headless: false,
            ..Default::default()
        };
        let caps = config.capabilities();
        let args = caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap();
        assert!(!args.iter().any(|a| a == "--headless"));
    }

    #[test]
    fn test_element_handles() {
        let value = json!([
            { "element-6066-11e4-a52e-4f735466cecf": "a1" },
            { "element-6066-11e4-a52e-4f735466cecf": "b2" }
        ]);
        let handles = element_handles(&value).unwrap();
        assert_eq!(
            handles,
            vec![ElementHandle("a1".into()), ElementHandle("b2".into())]
        );
        assert!(element_handles(&json!([{ "other": "x" }])).is_err());
        assert!(element_handles(&json!({})).is_err());
    }

    #[test]
    fn test_wire_error_message() {
        let value = json!({ "error": "no such window", "message": "window closed" });
        assert_eq!(wire_error(404, &value), "HTTP 404: no such window: window closed");
    }
}
