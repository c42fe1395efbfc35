//! Configuration management for the autofill service
//!
//! This module handles loading and validation of the service configuration.

pub mod models;

pub use models::*;

use crate::utils::error::{AutofillError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the service
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Service configuration
    pub autofill: AutofillConfig,
}

impl Config {
    /// Load configuration from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AutofillError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let autofill: AutofillConfig = serde_yaml::from_str(content)
            .map_err(|e| AutofillError::Config(format!("Failed to parse config: {}", e)))?;

        let config = Self { autofill };
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Get server configuration
    pub fn server(&self) -> &ServerConfig {
        &self.autofill.server
    }

    /// Get portal configuration
    pub fn portal(&self) -> &PortalConfig {
        &self.autofill.portal
    }

    /// Get processing configuration
    pub fn processing(&self) -> &ProcessingConfig {
        &self.autofill.processing
    }

    /// Get form configuration
    pub fn form(&self) -> &FormConfig {
        &self.autofill.form
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.autofill
            .server
            .validate()
            .map_err(|e| AutofillError::Config(format!("Server config error: {}", e)))?;

        self.autofill
            .portal
            .validate()
            .map_err(|e| AutofillError::Config(format!("Portal config error: {}", e)))?;

        self.autofill
            .processing
            .validate()
            .map_err(|e| AutofillError::Config(format!("Processing config error: {}", e)))?;

        self.autofill
            .form
            .validate()
            .map_err(|e| AutofillError::Config(format!("Form config error: {}", e)))?;

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.autofill)
            .map_err(|e| AutofillError::Config(format!("Failed to serialize config to YAML: {}", e)))
    }
}
