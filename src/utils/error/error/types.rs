//! Error types for the autofill service

use thiserror::Error;

use crate::core::driver::DriverError;

/// Result type alias for the autofill service
pub type Result<T> = std::result::Result<T, AutofillError>;

/// Main error type for the autofill service
#[derive(Error, Debug)]
pub enum AutofillError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet intake errors (unreadable or malformed upload)
    #[error("Intake error: {0}")]
    Intake(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad request errors
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflicts with the current session state (batch already active, etc.)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Browser driver errors surfaced outside of a running batch
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}
