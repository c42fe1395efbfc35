//! Configuration data models
//!
//! This module defines all configuration structures used throughout the service.

#![allow(missing_docs)]

pub mod autofill;
pub mod form;
pub mod portal;
pub mod processing;
pub mod server;

// Re-export all configuration types
pub use autofill::*;
pub use form::*;
pub use portal::*;
pub use processing::*;
pub use server::*;

use crate::core::locator::LocatorStrategy;

/// Default values for configuration
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default server port
pub fn default_port() -> u16 {
    8080
}

/// Default maximum body size in bytes
pub fn default_max_body_size() -> usize {
    1024 * 1024 // 1MB
}

pub fn default_true() -> bool {
    true
}

/// A locator list must be non-empty and every timeout positive
pub(crate) fn validate_locators(name: &str, locators: &[LocatorStrategy]) -> Result<(), String> {
    if locators.is_empty() {
        return Err(format!("{} needs at least one locator", name));
    }
    if let Some(bad) = locators
        .iter()
        .find(|l| l.timeout_ms == 0 || l.value.trim().is_empty())
    {
        return Err(format!("{} has an invalid locator: {}", name, bad));
    }
    Ok(())
}
