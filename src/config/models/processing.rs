//! Batch processing configuration

use serde::{Deserialize, Serialize};

/// Batch runner and session limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Inter-record delay used when a start request does not specify one
    #[serde(default = "default_delay_ms")]
    pub default_delay_ms: u64,
    /// Largest inter-record delay a start request may ask for
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Number of batch log entries retained
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Number of log entries returned when the client does not ask for a limit
    #[serde(default = "default_log_window")]
    pub log_window: usize,
    /// Largest accepted spreadsheet upload, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: default_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            log_capacity: default_log_capacity(),
            log_window: default_log_window(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ProcessingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.log_capacity == 0 {
            return Err("log_capacity must be at least 1".to_string());
        }
        if self.log_window == 0 {
            return Err("log_window must be at least 1".to_string());
        }
        if self.default_delay_ms > self.max_delay_ms {
            return Err(format!(
                "default_delay_ms ({}) exceeds max_delay_ms ({})",
                self.default_delay_ms, self.max_delay_ms
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes cannot be 0".to_string());
        }
        Ok(())
    }
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    600_000
}

fn default_log_capacity() -> usize {
    1000
}

fn default_log_window() -> usize {
    100
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024 // 5MB
}
