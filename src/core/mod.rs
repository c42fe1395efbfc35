//! Core functionality for the autofill service
//!
//! This module contains the batch engine and its data model.

pub mod controller;
pub mod datetime;
pub mod driver;
pub mod form_filler;
pub mod intake;
pub mod locator;
pub mod log_sink;
pub mod record;
pub mod runner;
pub mod session;


// Re-export commonly used types
pub use controller::{BatchController, RunOptions, StartAck, StartRequest, StopAck, UploadSummary};
pub use driver::{Credentials, DriverError, DriverFactory, ElementHandle, PortalDriver};
pub use log_sink::{LogEntry, LogSink, Severity};
pub use record::{ActionType, Record, RecordStatus};
pub use session::{RunnerPhase, SessionStore, StatusSnapshot};
