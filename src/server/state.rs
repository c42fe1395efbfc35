//! Application state shared across HTTP handlers

use crate::config::Config;
use crate::core::controller::BatchController;
use crate::core::driver::DriverFactory;
use std::sync::Arc;

/// HTTP server state shared across handlers
///
/// Cloned into every worker; all fields are `Arc`s so the batch session is
/// the same process-wide instance behind every worker.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration (shared read-only)
    pub config: Arc<Config>,
    /// Batch operations and the session behind them
    pub controller: Arc<BatchController>,
}

impl AppState {
    /// Create the state with the driver factory batches will launch from
    pub fn new(config: Config, factory: Arc<dyn DriverFactory>) -> Self {
        let controller = BatchController::new(&config, factory);
        Self {
            config: Arc::new(config),
            controller: Arc::new(controller),
        }
    }

    /// Get service configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
