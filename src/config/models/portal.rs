//! Portal and WebDriver configuration

use super::default_true;
use crate::core::locator::LocatorStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the portal lives and how to log in and find incidents on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// WebDriver endpoint (chromedriver, geckodriver, Selenium grid)
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Browser name requested from the WebDriver endpoint
    #[serde(default = "default_browser")]
    pub browser: String,
    /// Run the browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Portal login page
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Incident search page; `{id}` is replaced with the external id
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// User name input on the login page
    #[serde(default = "default_username_locators")]
    pub username: Vec<LocatorStrategy>,
    /// Password input on the login page
    #[serde(default = "default_password_locators")]
    pub password: Vec<LocatorStrategy>,
    /// Login button
    #[serde(default = "default_login_button_locators")]
    pub login_button: Vec<LocatorStrategy>,
    /// Any element that only exists once logged in
    #[serde(default = "default_logged_in_locators")]
    pub logged_in: Vec<LocatorStrategy>,
    /// Search hit for an incident; `{id}` is replaced with the external id
    #[serde(default = "default_search_result_locators")]
    pub search_result: Vec<LocatorStrategy>,
    /// Element shown after a successful save; empty means a click is enough
    #[serde(default)]
    pub save_confirmation: Vec<LocatorStrategy>,
    /// How long to wait for the logged-in marker
    #[serde(default = "default_login_timeout_ms")]
    pub login_timeout_ms: u64,
    /// Per-command HTTP timeout against the WebDriver endpoint
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Delay between element lookups while waiting for one to appear
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            browser: default_browser(),
            headless: true,
            login_url: default_login_url(),
            search_url: default_search_url(),
            username: default_username_locators(),
            password: default_password_locators(),
            login_button: default_login_button_locators(),
            logged_in: default_logged_in_locators(),
            search_result: default_search_result_locators(),
            save_confirmation: vec![],
            login_timeout_ms: default_login_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl PortalConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Search page URL for one incident
    pub fn search_url_for(&self, external_id: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(external_id.as_bytes()).collect();
        self.search_url.replace("{id}", &encoded)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("webdriver_url", &self.webdriver_url),
            ("login_url", &self.login_url),
        ] {
            url::Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", name, e))?;
        }

        if !self.search_url.contains("{id}") {
            return Err("search_url must contain the {id} placeholder".to_string());
        }
        url::Url::parse(&self.search_url.replace("{id}", "x"))
            .map_err(|e| format!("search_url is not a valid URL: {}", e))?;

        for (name, locators) in [
            ("username", &self.username),
            ("password", &self.password),
            ("login_button", &self.login_button),
            ("logged_in", &self.logged_in),
            ("search_result", &self.search_result),
        ] {
            super::validate_locators(name, locators)?;
        }
        if !self.save_confirmation.is_empty() {
            super::validate_locators("save_confirmation", &self.save_confirmation)?;
        }

        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms cannot be 0".to_string());
        }
        if self.command_timeout_ms == 0 || self.login_timeout_ms == 0 {
            return Err("portal timeouts cannot be 0".to_string());
        }
        Ok(())
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_browser() -> String {
    "chrome".to_string()
}

fn default_login_url() -> String {
    "https://portal.example.com/login".to_string()
}

fn default_search_url() -> String {
    "https://portal.example.com/incidents?search={id}".to_string()
}

fn default_username_locators() -> Vec<LocatorStrategy> {
    vec![
        LocatorStrategy::css("input[name='username']"),
        LocatorStrategy::css("input[type='email']"),
        LocatorStrategy::label("Username"),
    ]
}

fn default_password_locators() -> Vec<LocatorStrategy> {
    vec![
        LocatorStrategy::css("input[type='password']"),
        LocatorStrategy::label("Password"),
    ]
}

fn default_login_button_locators() -> Vec<LocatorStrategy> {
    vec![
        LocatorStrategy::css("button[type='submit']"),
        LocatorStrategy::xpath("//button[contains(normalize-space(.), 'Log in') or contains(normalize-space(.), 'Sign in')]"),
    ]
}

fn default_logged_in_locators() -> Vec<LocatorStrategy> {
    vec![
        LocatorStrategy::css("[data-user-menu]"),
        LocatorStrategy::xpath("//a[contains(normalize-space(.), 'Log out') or contains(normalize-space(.), 'Sign out')]"),
    ]
}

fn default_search_result_locators() -> Vec<LocatorStrategy> {
    vec![
        LocatorStrategy::xpath("//a[normalize-space(.)='{id}']"),
        LocatorStrategy::xpath("//tr[td[normalize-space(.)='{id}']]//a"),
    ]
}

fn default_login_timeout_ms() -> u64 {
    15_000
}

fn default_command_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    200
}
