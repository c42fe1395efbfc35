//! Server builder and run_server function
//!
//! This module provides the ServerBuilder for easier server configuration
//! and the run_server function for automatic configuration loading.

use crate::config::Config;
use crate::core::driver::DriverFactory;
use crate::server::server::HttpServer;
use crate::utils::error::{AutofillError, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Server builder for easier configuration
#[derive(Default)]
pub struct ServerBuilder {
    config: Option<Config>,
    factory: Option<Arc<dyn DriverFactory>>,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the WebDriver-backed factory
    pub fn with_driver_factory(mut self, factory: Arc<dyn DriverFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Build the HTTP server
    pub fn build(self) -> Result<HttpServer> {
        let config = self
            .config
            .ok_or_else(|| AutofillError::config("Configuration is required"))?;
        config.validate()?;

        match self.factory {
            Some(factory) => Ok(HttpServer::with_factory(&config, factory)),
            None => HttpServer::new(&config),
        }
    }
}

/// Load configuration, applying command line overrides
///
/// A file that is missing or fails to load falls back to defaults. The
/// overridden result must still validate.
pub async fn load_config(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
) -> Result<Config> {
    info!("Loading configuration file: {}", config_path.display());
    let mut config = match Config::from_file(config_path).await {
        Ok(config) => {
            info!("Configuration file loaded successfully");
            config
        }
        Err(e) => {
            warn!("Configuration file loading failed, using default config: {}", e);
            Config::default()
        }
    };

    if let Some(host) = host {
        config.autofill.server.host = host;
    }
    if let Some(port) = port {
        config.autofill.server.port = port;
    }

    config.validate()?;
    Ok(config)
}

/// Run the server with automatic configuration loading
pub async fn run_server(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    info!("Starting {} v{}", crate::NAME, crate::VERSION);

    let config = load_config(config_path, host, port).await?;
    let server = ServerBuilder::new().with_config(config.clone()).build()?;

    info!(
        "Server starting at: http://{}:{}",
        config.server().host,
        config.server().port
    );
    info!("WebDriver endpoint: {}", config.portal().webdriver_url);
    info!("API Endpoints:");
    info!("   GET  /health - Health check");
    info!("   POST /api/upload - Upload incident spreadsheet");
    info!("   POST /api/start - Start batch");
    info!("   POST /api/stop - Stop batch");
    info!("   GET  /api/status - Batch status");
    info!("   GET  /api/logs - Recent log entries");
    info!("   POST /api/clear - Reset session");

    server.start().await
}
