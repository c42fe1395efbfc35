//! Browser driver capability
//!
//! The batch engine never talks to a browser directly. It drives a
//! [`PortalDriver`] obtained from a [`DriverFactory`], one driver per batch.
//! The production implementation speaks the W3C WebDriver protocol
//! ([`webdriver::WebDriverFactory`]); tests plug in scripted fakes.

pub mod webdriver;

use crate::core::locator::LocatorStrategy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque reference to a UI element inside the current driver session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(String);

impl ElementHandle {
    /// Wrap a driver-specific element reference
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Driver-specific element reference
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Portal login credentials
///
/// Held only for the lifetime of a batch task. `Debug` never prints the password.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    /// Portal user name
    #[serde(default)]
    pub username: String,
    /// Portal password
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields present
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .finish()
    }
}

/// Errors raised by a browser driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The browser session could not be started
    #[error("failed to launch browser session: {0}")]
    Launch(String),

    /// The browser session is gone (crashed, closed, unreachable)
    #[error("browser session lost: {0}")]
    SessionLost(String),

    /// A driver-side wait expired
    #[error("driver timeout: {0}")]
    Timeout(String),

    /// Element-level failure (stale, not interactable, vanished)
    #[error("element error: {0}")]
    Element(String),

    /// Any other protocol-level failure
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl DriverError {
    /// Fatal errors abort the whole batch; everything else only affects the
    /// current field or record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Launch(_) | DriverError::SessionLost(_))
    }
}

/// Result alias for driver calls
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Launches driver sessions; one session is launched per batch
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Start a fresh browser session
    async fn launch(&self) -> DriverResult<Box<dyn PortalDriver>>;
}

/// One live, stateful browser session against the portal
///
/// A session is not safe to drive from two tasks at once, so the batch
/// runner owns it exclusively and calls it sequentially.
#[async_trait]
pub trait PortalDriver: Send + Sync {
    /// Log in to the portal. `Ok(false)` means the portal refused the credentials.
    async fn authenticate(&self, credentials: &Credentials) -> DriverResult<bool>;

    /// Navigate to the incident identified by `external_id`. `Ok(false)` means not found.
    async fn search(&self, external_id: &str) -> DriverResult<bool>;

    /// Find one visible, interactable element with a single strategy.
    ///
    /// May wait; callers bound the wait with the strategy timeout.
    async fn locate(&self, strategy: &LocatorStrategy) -> DriverResult<Option<ElementHandle>>;

    /// Remove any existing content from a free-text control
    async fn clear(&self, handle: &ElementHandle) -> DriverResult<()>;

    /// Set a control's value (select an option, or type text)
    async fn set_value(&self, handle: &ElementHandle, value: &str) -> DriverResult<()>;

    /// Activate a save control; `Ok(true)` when the portal accepted the record
    async fn submit(&self, handle: &ElementHandle) -> DriverResult<bool>;

    /// Release the browser session
    async fn close(&self) -> DriverResult<()>;
}
