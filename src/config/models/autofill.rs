//! Top-level service configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Main autofill configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AutofillConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Portal and WebDriver configuration
    #[serde(default)]
    pub portal: PortalConfig,
    /// Batch processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Incident form configuration
    #[serde(default)]
    pub form: FormConfig,
}
