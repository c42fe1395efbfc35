//! Locator resolution with ordered fallback
//!
//! The portal's markup is not contractually stable, so every logical field is
//! described by a prioritized list of [`LocatorStrategy`] values from
//! configuration. Strategies are tried strictly in order, each bounded by its
//! own timeout, and the first one that yields a visible, interactable element
//! wins. No scoring, no backtracking.

use crate::core::driver::{DriverResult, ElementHandle, PortalDriver};
use crate::core::log_sink::LogSink;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// How a strategy matches an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    /// CSS selector
    Css,
    /// XPath expression
    Xpath,
    /// `id` attribute
    Id,
    /// `name` attribute
    Name,
    /// `placeholder` attribute
    Placeholder,
    /// Control following a `<label>` with this text
    Label,
    /// `aria-label` attribute
    AriaLabel,
    /// Exact link text
    LinkText,
}

/// One way of finding a UI control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorStrategy {
    pub by: LocatorKind,
    pub value: String,
    /// Upper bound on the wait for this strategy
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    3000
}

impl LocatorStrategy {
    pub fn new(by: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            by,
            value: value.into(),
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Css, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Xpath, value)
    }

    pub fn label(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Label, value)
    }

    pub fn placeholder(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Placeholder, value)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Replace every `{key}` in the value
    pub fn substitute(&self, key: &str, replacement: &str) -> Self {
        Self {
            by: self.by,
            value: self.value.replace(&format!("{{{}}}", key), replacement),
            timeout_ms: self.timeout_ms,
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}={}", self.by, self.value)
    }
}

/// Kind of form control; decides the fill semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Enumerated control: value is set directly
    Select,
    /// Free text: cleared fully before typing
    #[default]
    Text,
}

/// Outcome of filling one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Filled using the strategy at this position
    Filled { strategy: usize },
    /// Every strategy was exhausted
    NotFound,
    /// Located, but the driver refused the value
    Rejected(String),
}

impl FieldOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, FieldOutcome::Filled { .. })
    }
}

/// Resolves logical fields against the driver with ordered fallback
pub struct LocatorResolver<'a> {
    driver: &'a dyn PortalDriver,
    logs: &'a LogSink,
}

impl<'a> LocatorResolver<'a> {
    pub fn new(driver: &'a dyn PortalDriver, logs: &'a LogSink) -> Self {
        Self { driver, logs }
    }

    /// Try `strategies` in order and return the first hit with its position.
    ///
    /// Timeouts, misses and non-fatal driver errors fall through to the next
    /// strategy. Fatal driver errors are returned immediately.
    pub async fn locate_with_index(
        &self,
        field: &str,
        strategies: &[LocatorStrategy],
    ) -> DriverResult<Option<(usize, ElementHandle)>> {
        for (index, strategy) in strategies.iter().enumerate() {
            match tokio::time::timeout(strategy.timeout(), self.driver.locate(strategy)).await {
                Ok(Ok(Some(handle))) => {
                    debug!(field, strategy = %strategy, "Locator matched");
                    return Ok(Some((index, handle)));
                }
                Ok(Ok(None)) => {
                    debug!(field, strategy = %strategy, "Locator found nothing");
                }
                Ok(Err(e)) if e.is_fatal() => return Err(e),
                Ok(Err(e)) => {
                    debug!(field, strategy = %strategy, error = %e, "Locator failed");
                }
                Err(_) => {
                    debug!(field, strategy = %strategy, timeout_ms = strategy.timeout_ms, "Locator timed out");
                }
            }
        }

        self.logs.warning(format!(
            "Field \"{}\" not found after {} locator strategies",
            field,
            strategies.len()
        ));
        Ok(None)
    }

    /// Like [`Self::locate_with_index`] without the position
    pub async fn locate(
        &self,
        field: &str,
        strategies: &[LocatorStrategy],
    ) -> DriverResult<Option<ElementHandle>> {
        Ok(self
            .locate_with_index(field, strategies)
            .await?
            .map(|(_, handle)| handle))
    }

    /// Locate `field` and write `value` into it.
    ///
    /// A missing or refusing field is not an error; only fatal driver
    /// failures are.
    pub async fn fill(
        &self,
        field: &str,
        kind: FieldKind,
        value: &str,
        strategies: &[LocatorStrategy],
    ) -> DriverResult<FieldOutcome> {
        let Some((index, handle)) = self.locate_with_index(field, strategies).await? else {
            return Ok(FieldOutcome::NotFound);
        };

        let written = match kind {
            FieldKind::Select => self.driver.set_value(&handle, value).await,
            FieldKind::Text => match self.driver.clear(&handle).await {
                Ok(()) => self.driver.set_value(&handle, value).await,
                Err(e) => Err(e),
            },
        };

        match written {
            Ok(()) => Ok(FieldOutcome::Filled { strategy: index }),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.logs
                    .warning(format!("Field \"{}\" could not be set: {}", field, e));
                Ok(FieldOutcome::Rejected(e.to_string()))
            }
        }
    }
}
