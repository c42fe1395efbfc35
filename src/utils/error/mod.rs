//! Error Handling utilities
//!
//! This module provides the service error type and its HTTP mapping.

pub mod error;

pub use error::*;
