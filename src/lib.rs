//! # incident-autofill
//!
//! Unattended incident form filling. A spreadsheet of incidents is uploaded,
//! then replayed one record at a time into a web portal through a WebDriver
//! browser session.
//!
//! ## Features
//!
//! - **Spreadsheet intake**: CSV and TSV with header aliases and delimiter detection
//! - **Ordered locator fallback**: every form field has a list of candidate locators
//! - **Background batches**: start returns immediately, progress is polled
//! - **Cooperative stop**: a running batch halts after its current record
//! - **Crash-safe cleanup**: the browser session is closed however the batch ends
//!
//! ## Running the service
//!
//! ```rust,no_run
//! use incident_autofill::{Config, server::HttpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/autofill.yaml").await?;
//!     let server = HttpServer::new(&config)?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod server;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use core::{BatchController, Record, RecordStatus, RunnerPhase, StatusSnapshot};
pub use utils::error::{AutofillError, Result};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Service build information
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Version number
    pub version: &'static str,
    /// Build timestamp (seconds since the epoch)
    pub build_time: &'static str,
    /// Git commit hash
    pub git_hash: &'static str,
    /// Rust version
    pub rust_version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: env!("BUILD_TIME"),
            git_hash: env!("GIT_HASH"),
            rust_version: env!("RUST_VERSION"),
        }
    }
}

/// Build information recorded by the build script
pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}
