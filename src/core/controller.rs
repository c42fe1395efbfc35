//! Batch controller: the operations exposed to clients
//!
//! Upload, start, stop, status, logs and clear. All of them return quickly;
//! the batch itself runs on a spawned task.

use crate::config::{Config, ProcessingConfig};
use crate::core::driver::{Credentials, DriverFactory};
use crate::core::form_filler::IncidentFormFiller;
use crate::core::intake;
use crate::core::log_sink::LogEntry;
use crate::core::record::Record;
use crate::core::runner::{BatchRunner, RunPlan};
use crate::core::session::{RunnerPhase, SessionStore, StatusSnapshot};
use crate::utils::error::{AutofillError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-run options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    pub inter_record_delay_ms: Option<u64>,
}

/// Body of a start request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub config: RunOptions,
}

/// Reply to an upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub batch_id: Uuid,
    pub records: Vec<Record>,
    pub count: usize,
    pub discarded: usize,
}

/// Reply to an accepted start
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAck {
    pub batch_id: Uuid,
    /// Records the run will work through
    pub queued: usize,
    pub inter_record_delay_ms: u64,
}

/// Reply to a stop
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopAck {
    pub stop_requested: bool,
    pub is_processing: bool,
}

/// Entry point for every batch operation
pub struct BatchController {
    store: Arc<SessionStore>,
    factory: Arc<dyn DriverFactory>,
    filler: Arc<IncidentFormFiller>,
    processing: ProcessingConfig,
    task: Mutex<Option<JoinHandle<RunnerPhase>>>,
}

impl BatchController {
    pub fn new(config: &Config, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            store: Arc::new(SessionStore::new(config.processing().log_capacity)),
            factory,
            filler: Arc::new(IncidentFormFiller::new(config.form().clone())),
            processing: config.processing().clone(),
            task: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Parse an uploaded sheet and make it the current batch
    pub fn upload(&self, bytes: &[u8], filename: Option<&str>) -> Result<UploadSummary> {
        if bytes.len() > self.processing.max_upload_bytes {
            return Err(AutofillError::bad_request(format!(
                "upload of {} bytes exceeds the {} byte limit",
                bytes.len(),
                self.processing.max_upload_bytes
            )));
        }
        if self.store.is_processing() {
            return Err(AutofillError::conflict(
                "cannot upload while a batch is being processed",
            ));
        }

        let sheet = intake::parse_sheet(bytes, filename)?;
        let batch_id = self
            .store
            .replace_records(sheet.records.clone(), sheet.discarded)?;

        info!(%batch_id, count = sheet.records.len(), discarded = sheet.discarded, "Batch uploaded");
        Ok(UploadSummary {
            batch_id,
            count: sheet.records.len(),
            discarded: sheet.discarded,
            records: sheet.records,
        })
    }

    /// Validate and launch a run in the background
    pub fn start(&self, request: StartRequest) -> Result<StartAck> {
        if !request.credentials.is_complete() {
            return Err(AutofillError::validation("username and password are required"));
        }

        let delay_ms = request
            .config
            .inter_record_delay_ms
            .unwrap_or(self.processing.default_delay_ms);
        if delay_ms > self.processing.max_delay_ms {
            return Err(AutofillError::validation(format!(
                "interRecordDelayMs must be at most {}",
                self.processing.max_delay_ms
            )));
        }

        let ticket = self.store.try_begin()?;
        let ack = StartAck {
            batch_id: ticket.batch_id,
            queued: ticket.pending.len(),
            inter_record_delay_ms: delay_ms,
        };

        let runner = BatchRunner::new(
            Arc::clone(&self.store),
            Arc::clone(&self.factory),
            Arc::clone(&self.filler),
        );
        let plan = RunPlan {
            credentials: request.credentials,
            pending: ticket.pending,
            inter_record_delay: Duration::from_millis(delay_ms),
        };
        let handle = tokio::spawn(async move { runner.run(plan).await });
        *self.task.lock() = Some(handle);

        info!(batch_id = %ack.batch_id, queued = ack.queued, "Batch started");
        Ok(ack)
    }

    /// Ask the running batch to stop after its current record
    pub fn stop(&self) -> StopAck {
        let is_processing = self.store.request_stop();
        if is_processing {
            self.store
                .logs()
                .warning("Stop requested; finishing the current record first");
        }
        StopAck {
            stop_requested: true,
            is_processing,
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        self.store.status()
    }

    /// Newest log entries; `None` means the configured window
    pub fn logs(&self, limit: Option<usize>) -> Vec<LogEntry> {
        let limit = limit
            .unwrap_or(self.processing.log_window)
            .min(self.store.logs().capacity());
        self.store.recent_logs(limit)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        info!("Session cleared");
        Ok(())
    }

    /// Wait for the last started run to finish
    pub async fn join(&self) -> Option<RunnerPhase> {
        let handle = self.task.lock().take()?;
        match handle.await {
            Ok(phase) => Some(phase),
            Err(e) => {
                warn!(error = %e, "Batch task did not finish cleanly");
                None
            }
        }
    }
}
