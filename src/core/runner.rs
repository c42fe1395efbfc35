//! Batch runner
//!
//! Walks the pending records of one batch through a single browser session:
//!
//! ```text
//! Idle -> LoggingIn -> Processing(i) -> Completed | Stopped | Aborted
//! ```
//!
//! Records are processed strictly in ascending sequence index, one at a time.
//! A per-record failure marks that record failed and moves on; a fatal
//! driver error or a panic aborts the run. The stop signal is honoured
//! between records, never in the middle of one. Cleanup runs on every exit.

use crate::core::driver::{Credentials, DriverError, DriverFactory, PortalDriver};
use crate::core::form_filler::{FillOutcome, IncidentFormFiller};
use crate::core::record::{Record, RecordStatus};
use crate::core::session::{RunnerPhase, SessionStore};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How one record ended, short of a fatal error
#[derive(Debug, Clone, PartialEq, Eq)]
enum RecordResult {
    Completed,
    Failed(String),
}

/// Parameters of one run
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub credentials: Credentials,
    /// Sequence indices to process, ascending
    pub pending: Vec<usize>,
    pub inter_record_delay: Duration,
}

/// Drives one batch run against the session store
#[derive(Clone)]
pub struct BatchRunner {
    store: Arc<SessionStore>,
    factory: Arc<dyn DriverFactory>,
    filler: Arc<IncidentFormFiller>,
}

impl BatchRunner {
    pub fn new(
        store: Arc<SessionStore>,
        factory: Arc<dyn DriverFactory>,
        filler: Arc<IncidentFormFiller>,
    ) -> Self {
        Self {
            store,
            factory,
            filler,
        }
    }

    /// Execute a run that has already been claimed with
    /// [`SessionStore::try_begin`]. Returns the final phase.
    pub async fn run(&self, plan: RunPlan) -> RunnerPhase {
        self.store.set_phase(RunnerPhase::LoggingIn);
        self.store.logs().info(format!(
            "Starting batch: {} record(s) to process",
            plan.pending.len()
        ));

        let phase = match AssertUnwindSafe(self.attend(&plan)).catch_unwind().await {
            Ok(phase) => phase,
            Err(panic) => self.abort_on_panic(panic.as_ref()),
        };

        self.store.finish(phase.clone());
        info!(phase = ?phase, "Batch run finished");
        phase
    }

    /// Launch, drive and close one browser session
    async fn attend(&self, plan: &RunPlan) -> RunnerPhase {
        let logs = self.store.logs();
        let driver = match self.factory.launch().await {
            Ok(driver) => driver,
            Err(e) => {
                let reason = e.to_string();
                logs.error(format!("Batch aborted: {}", reason));
                return RunnerPhase::Aborted { reason };
            }
        };

        let phase = match AssertUnwindSafe(self.drive(driver.as_ref(), plan))
            .catch_unwind()
            .await
        {
            Ok(phase) => phase,
            Err(panic) => self.abort_on_panic(panic.as_ref()),
        };

        if let Err(e) = driver.close().await {
            logs.warning(format!("Failed to close browser session: {}", e));
        }
        phase
    }

    fn abort_on_panic(&self, panic: &(dyn Any + Send)) -> RunnerPhase {
        let reason = format!("internal error: {}", panic_message(panic));
        self.store.fail_in_flight(&reason);
        self.store.logs().error(format!("Batch aborted: {}", reason));
        RunnerPhase::Aborted { reason }
    }

    async fn drive(&self, driver: &dyn PortalDriver, plan: &RunPlan) -> RunnerPhase {
        let logs = self.store.logs();

        let rejected = match driver.authenticate(&plan.credentials).await {
            Ok(true) => None,
            Ok(false) => Some("authentication rejected by the portal".to_string()),
            Err(e) => Some(format!("authentication failed: {}", e)),
        };
        if let Some(reason) = rejected {
            logs.error(format!("Batch aborted: {}", reason));
            return RunnerPhase::Aborted { reason };
        }
        logs.success(format!(
            "Logged in to the portal as {}",
            plan.credentials.username
        ));

        let total = plan.pending.len();
        for (position, &index) in plan.pending.iter().enumerate() {
            if self.store.stop_signal().is_raised() {
                logs.warning(format!(
                    "Batch stopped on request; {} record(s) left pending",
                    total - position
                ));
                return RunnerPhase::Stopped;
            }

            let record = match self.store.mark_processing(index) {
                Ok(record) => record,
                Err(e) => {
                    let reason = e.to_string();
                    logs.error(format!("Batch aborted: {}", reason));
                    return RunnerPhase::Aborted { reason };
                }
            };
            logs.info(format!(
                "Processing record {} of {}: {}",
                position + 1,
                total,
                record.external_id
            ));

            let (status, detail) = match self.process_record(driver, &record).await {
                Ok(RecordResult::Completed) => {
                    logs.success(format!("Record {} saved", record.external_id));
                    (RecordStatus::Completed, None)
                }
                Ok(RecordResult::Failed(reason)) => {
                    logs.error(format!("Record {} failed: {}", record.external_id, reason));
                    (RecordStatus::Failed, Some(reason))
                }
                Err(e) => {
                    let reason = e.to_string();
                    self.store.fail_in_flight(&reason);
                    logs.error(format!("Batch aborted: {}", reason));
                    return RunnerPhase::Aborted { reason };
                }
            };

            if let Err(e) = self.store.mark_terminal(index, status, detail) {
                let reason = e.to_string();
                logs.error(format!("Batch aborted: {}", reason));
                return RunnerPhase::Aborted { reason };
            }

            if position + 1 < total && !self.pause(plan.inter_record_delay).await {
                debug!("Inter-record delay cut short by stop request");
            }
        }

        let tally = self.store.tally();
        logs.success(format!(
            "Batch completed: {} completed, {} failed",
            tally.completed, tally.failed
        ));
        RunnerPhase::Completed
    }

    /// Search, fill and save one record. `Err` only for fatal driver errors.
    async fn process_record(
        &self,
        driver: &dyn PortalDriver,
        record: &Record,
    ) -> Result<RecordResult, DriverError> {
        match driver.search(&record.external_id).await {
            Ok(true) => {}
            Ok(false) => {
                return Ok(RecordResult::Failed(format!(
                    "target not found: {}",
                    record.external_id
                )));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => return Ok(RecordResult::Failed(format!("search failed: {}", e))),
        }

        match self
            .filler
            .fill_and_submit(driver, self.store.logs(), record)
            .await
        {
            Ok(FillOutcome::Success { .. }) => Ok(RecordResult::Completed),
            Ok(FillOutcome::Failure { reason }) => Ok(RecordResult::Failed(reason)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(RecordResult::Failed(e.to_string())),
        }
    }

    /// Sleep for `delay` unless a stop arrives first. Returns `false` when stopped.
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.store.stop_signal().is_raised();
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.store.stop_signal().raised() => false,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic in batch task".to_string()
    }
}
