//! Utility modules for the autofill service
//!
//! - **error**: the service error type and its HTTP mapping

pub mod error;

pub use error::{AutofillError, Result};
