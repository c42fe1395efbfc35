//! Integration tests for incident-autofill
//!
//! These drive the HTTP API with the scripted portal behind it.

pub mod api_tests;
pub mod batch_tests;
