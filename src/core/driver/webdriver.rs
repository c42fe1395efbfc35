//! W3C WebDriver implementation of the driver capability
//!
//! Talks JSON over HTTP to chromedriver, geckodriver or a Selenium grid.
//! Only the handful of endpoints the portal workflow needs are used.

use super::{Credentials, DriverError, DriverFactory, DriverResult, ElementHandle, PortalDriver};
use crate::config::PortalConfig;
use crate::core::locator::{LocatorKind, LocatorStrategy};
use crate::utils::error::{AutofillError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Key under which W3C element references are returned
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Quote `value` as an XPath string literal
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

fn css_attribute(attribute: &str, value: &str) -> String {
    format!(
        "[{}=\"{}\"]",
        attribute,
        value.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

/// Translate a strategy into a WebDriver `(using, value)` pair
fn wire_locator(strategy: &LocatorStrategy) -> (&'static str, String) {
    let value = strategy.value.as_str();
    match strategy.by {
        LocatorKind::Css => ("css selector", value.to_string()),
        LocatorKind::Xpath => ("xpath", value.to_string()),
        LocatorKind::Id => ("css selector", css_attribute("id", value)),
        LocatorKind::Name => ("css selector", css_attribute("name", value)),
        LocatorKind::Placeholder => ("css selector", css_attribute("placeholder", value)),
        LocatorKind::AriaLabel => ("css selector", css_attribute("aria-label", value)),
        LocatorKind::Label => (
            "xpath",
            format!(
                "//label[normalize-space()={}]/following::*[self::input or self::select or self::textarea][1]",
                xpath_literal(value)
            ),
        ),
        LocatorKind::LinkText => ("link text", value.to_string()),
    }
}

/// Map a WebDriver error code onto the driver taxonomy
fn map_wire_error(code: &str, message: &str) -> DriverError {
    let detail = format!("{}: {}", code, message);
    match code {
        "invalid session id" | "no such window" => DriverError::SessionLost(detail),
        "no such element" | "stale element reference" | "element not interactable"
        | "element click intercepted" => DriverError::Element(detail),
        "timeout" | "script timeout" => DriverError::Timeout(detail),
        _ => DriverError::Protocol(detail),
    }
}

fn map_transport_error(err: reqwest::Error) -> DriverError {
    if err.is_timeout() {
        DriverError::Timeout(format!("WebDriver command timed out: {}", err))
    } else if err.is_connect() {
        DriverError::SessionLost(format!("WebDriver endpoint unreachable: {}", err))
    } else {
        DriverError::Protocol(format!("WebDriver request failed: {}", err))
    }
}

/// Send one command and unwrap the `value` member of the reply
async fn execute(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> DriverResult<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    let payload: Value = response.json().await.map_err(|e| {
        DriverError::Protocol(format!("Invalid WebDriver response ({}): {}", status, e))
    })?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let code = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(map_wire_error(code, message));
    }
    Ok(value)
}

/// Launches WebDriver sessions for the configured portal
pub struct WebDriverFactory {
    client: Client,
    portal: Arc<PortalConfig>,
}

impl WebDriverFactory {
    pub fn new(portal: PortalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(portal.command_timeout())
            .build()
            .map_err(|e| AutofillError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            portal: Arc::new(portal),
        })
    }

    fn capabilities(&self) -> Value {
        let browser = self.portal.browser.to_ascii_lowercase();
        let mut always_match = json!({ "browserName": browser });

        let (options_key, args): (&str, Vec<&str>) = match browser.as_str() {
            "firefox" => ("moz:firefoxOptions", vec!["-headless"]),
            "microsoftedge" | "msedge" | "edge" => {
                ("ms:edgeOptions", vec!["--headless=new", "--disable-gpu"])
            }
            _ => (
                "goog:chromeOptions",
                vec!["--headless=new", "--disable-gpu", "--no-sandbox"],
            ),
        };
        if self.portal.headless {
            always_match[options_key] = json!({ "args": args });
        }

        json!({ "capabilities": { "alwaysMatch": always_match } })
    }
}

#[async_trait]
impl DriverFactory for WebDriverFactory {
    async fn launch(&self) -> DriverResult<Box<dyn PortalDriver>> {
        let base = self.portal.webdriver_url.trim_end_matches('/');
        let url = format!("{}/session", base);

        let value = execute(&self.client, Method::POST, &url, Some(self.capabilities()))
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Launch("WebDriver reply carries no sessionId".to_string()))?;

        info!(session_id, browser = %self.portal.browser, "Browser session started");
        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", base, session_id),
            portal: Arc::clone(&self.portal),
            closed: AtomicBool::new(false),
        }))
    }
}

/// One live WebDriver session
pub struct WebDriverSession {
    client: Client,
    session_url: String,
    portal: Arc<PortalConfig>,
    closed: AtomicBool,
}

impl WebDriverSession {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> DriverResult<Value> {
        let url = format!("{}/{}", self.session_url, path);
        execute(&self.client, method, &url, body).await
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        debug!(url, "Navigating");
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    fn element_ids(value: Value) -> Vec<String> {
        value
            .as_array()
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|e| e.get(ELEMENT_KEY).and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn find_elements(&self, strategy: &LocatorStrategy) -> DriverResult<Vec<String>> {
        let (using, value) = wire_locator(strategy);
        let found = self
            .command(
                Method::POST,
                "elements",
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        Ok(Self::element_ids(found))
    }

    async fn element_flag(&self, id: &str, flag: &str) -> DriverResult<bool> {
        let value = self
            .command(Method::GET, &format!("element/{}/{}", id, flag), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Displayed and enabled; vanished elements count as unusable
    async fn is_usable(&self, id: &str) -> DriverResult<bool> {
        let checked = match self.element_flag(id, "displayed").await {
            Ok(true) => self.element_flag(id, "enabled").await,
            other => other,
        };
        match checked {
            Err(DriverError::Element(_)) => Ok(false),
            other => other,
        }
    }

    /// First usable element for `strategy`, without waiting
    async fn probe(&self, strategy: &LocatorStrategy) -> DriverResult<Option<String>> {
        for id in self.find_elements(strategy).await? {
            if self.is_usable(&id).await? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Poll `strategy` until a usable element appears or `wait` expires
    async fn wait_for(&self, strategy: &LocatorStrategy, wait: Duration) -> DriverResult<Option<String>> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(id) = self.probe(strategy).await? {
                return Ok(Some(id));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.portal.poll_interval()).await;
        }
    }

    /// First strategy in the list that yields an element within its own timeout
    async fn first_match(&self, strategies: &[LocatorStrategy]) -> DriverResult<Option<String>> {
        for strategy in strategies {
            if let Some(id) = self.wait_for(strategy, strategy.timeout()).await? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Any strategy in the list, polled together until `wait` expires
    async fn any_within(&self, strategies: &[LocatorStrategy], wait: Duration) -> DriverResult<bool> {
        let deadline = Instant::now() + wait;
        loop {
            for strategy in strategies {
                if self.probe(strategy).await?.is_some() {
                    return Ok(true);
                }
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.portal.poll_interval()).await;
        }
    }

    async fn required(&self, name: &str, strategies: &[LocatorStrategy]) -> DriverResult<String> {
        self.first_match(strategies)
            .await?
            .ok_or_else(|| DriverError::Element(format!("login page has no {} control", name)))
    }

    async fn click(&self, id: &str) -> DriverResult<()> {
        self.command(Method::POST, &format!("element/{}/click", id), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn type_text(&self, id: &str, text: &str) -> DriverResult<()> {
        self.command(
            Method::POST,
            &format!("element/{}/value", id),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn clear_element(&self, id: &str) -> DriverResult<()> {
        self.command(Method::POST, &format!("element/{}/clear", id), Some(json!({})))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PortalDriver for WebDriverSession {
    async fn authenticate(&self, credentials: &Credentials) -> DriverResult<bool> {
        self.navigate(&self.portal.login_url).await?;

        let username = self.required("username", &self.portal.username).await?;
        self.clear_element(&username).await?;
        self.type_text(&username, &credentials.username).await?;

        let password = self.required("password", &self.portal.password).await?;
        self.clear_element(&password).await?;
        self.type_text(&password, &credentials.password).await?;

        let button = self.required("login button", &self.portal.login_button).await?;
        self.click(&button).await?;

        self.any_within(&self.portal.logged_in, self.portal.login_timeout())
            .await
    }

    async fn search(&self, external_id: &str) -> DriverResult<bool> {
        self.navigate(&self.portal.search_url_for(external_id)).await?;

        let strategies: Vec<LocatorStrategy> = self
            .portal
            .search_result
            .iter()
            .map(|s| s.substitute("id", external_id))
            .collect();

        match self.first_match(&strategies).await? {
            Some(hit) => {
                self.click(&hit).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn locate(&self, strategy: &LocatorStrategy) -> DriverResult<Option<ElementHandle>> {
        Ok(self
            .wait_for(strategy, strategy.timeout())
            .await?
            .map(ElementHandle::new))
    }

    async fn clear(&self, handle: &ElementHandle) -> DriverResult<()> {
        self.clear_element(handle.id()).await
    }

    async fn set_value(&self, handle: &ElementHandle, value: &str) -> DriverResult<()> {
        let tag = self
            .command(Method::GET, &format!("element/{}/name", handle.id()), None)
            .await?;

        if !tag.as_str().is_some_and(|t| t.eq_ignore_ascii_case("select")) {
            return self.type_text(handle.id(), value).await;
        }

        let literal = xpath_literal(value);
        let options = self
            .command(
                Method::POST,
                &format!("element/{}/elements", handle.id()),
                Some(json!({
                    "using": "xpath",
                    "value": format!(".//option[normalize-space(.)={0} or @value={0}]", literal),
                })),
            )
            .await?;

        match Self::element_ids(options).first() {
            Some(option) => self.click(option).await,
            None => Err(DriverError::Element(format!(
                "no option matching '{}'",
                value
            ))),
        }
    }

    async fn submit(&self, handle: &ElementHandle) -> DriverResult<bool> {
        self.click(handle.id()).await?;
        if self.portal.save_confirmation.is_empty() {
            return Ok(true);
        }
        Ok(self.first_match(&self.portal.save_confirmation).await?.is_some())
    }

    async fn close(&self) -> DriverResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        execute(&self.client, Method::DELETE, &self.session_url, None).await?;
        info!("Browser session closed");
        Ok(())
    }
}
