//! Error handling for the autofill service
//!
//! This module defines the error types returned across the HTTP boundary.

#![allow(missing_docs)]

mod conversions;
mod helpers;
mod response;
mod types;

pub use response::{ErrorDetail, ErrorResponse};
pub use types::{AutofillError, Result};
