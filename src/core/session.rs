//! Process-wide batch session and its read accessor
//!
//! All batch state lives in one [`SessionStore`] shared through `Arc`. Every
//! mutation happens under a single write lock and never across an `.await`,
//! so a reader always sees the record statuses, `processed_count` and
//! `current_record` agree with each other.

use crate::core::log_sink::{LogEntry, LogSink};
use crate::core::record::{Record, RecordStatus};
use crate::utils::error::{AutofillError, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use uuid::Uuid;

/// Where the batch runner currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RunnerPhase {
    #[default]
    Idle,
    LoggingIn,
    Processing {
        index: usize,
    },
    Completed,
    Stopped,
    Aborted {
        reason: String,
    },
}

impl RunnerPhase {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RunnerPhase::Completed | RunnerPhase::Stopped | RunnerPhase::Aborted { .. }
        )
    }
}

/// Cooperative stop flag with wake-up
#[derive(Debug, Default)]
pub struct StopSignal {
    raised: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn lower(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Resolves once the flag is raised
    pub async fn raised(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_raised() {
                return;
            }
            notified.await;
        }
    }
}

/// Mutable batch state
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub batch_id: Option<Uuid>,
    pub is_processing: bool,
    /// Sequence index of the record in `processing`
    pub current_record: Option<usize>,
    pub total_count: usize,
    pub processed_count: usize,
    pub discarded_count: usize,
    pub records: Vec<Record>,
    pub phase: RunnerPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Session {
    fn record_mut(&mut self, index: usize) -> Result<&mut Record> {
        self.records
            .iter_mut()
            .find(|record| record.sequence_index == index)
            .ok_or_else(|| AutofillError::not_found(format!("record {} is not loaded", index)))
    }

    fn has_pending(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.status == RecordStatus::Pending)
    }
}

/// Accepted start: what the runner should work through
#[derive(Debug, Clone)]
pub struct BatchTicket {
    pub batch_id: Uuid,
    /// Sequence indices of the pending records, ascending
    pub pending: Vec<usize>,
}

/// Read-only copy of the session for polling clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub batch_id: Option<Uuid>,
    pub is_processing: bool,
    pub phase: RunnerPhase,
    pub stop_requested: bool,
    pub current_record: Option<Record>,
    pub total_count: usize,
    pub processed_count: usize,
    pub progress_percent: u32,
    pub discarded_count: usize,
    pub records: Vec<Record>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Completed and failed record counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub completed: usize,
    pub failed: usize,
}

fn progress_percent(processed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((processed as f64 / total as f64) * 100.0).round() as u32
}

/// Shared owner of the session, its log and its stop signal
#[derive(Debug)]
pub struct SessionStore {
    session: RwLock<Session>,
    logs: LogSink,
    stop: StopSignal,
}

impl SessionStore {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            session: RwLock::new(Session::default()),
            logs: LogSink::new(log_capacity),
            stop: StopSignal::default(),
        }
    }

    pub fn logs(&self) -> &LogSink {
        &self.logs
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn is_processing(&self) -> bool {
        self.session.read().is_processing
    }

    /// Raise the stop signal if a run is active. Returns whether one was.
    pub fn request_stop(&self) -> bool {
        let session = self.session.read();
        if session.is_processing {
            self.stop.raise();
        }
        session.is_processing
    }

    /// Load a freshly parsed batch, replacing whatever was there
    pub fn replace_records(&self, records: Vec<Record>, discarded: usize) -> Result<Uuid> {
        let batch_id = Uuid::new_v4();
        let count = records.len();
        {
            let mut session = self.session.write();
            if session.is_processing {
                return Err(AutofillError::conflict(
                    "cannot upload while a batch is being processed",
                ));
            }
            *session = Session {
                batch_id: Some(batch_id),
                total_count: count,
                discarded_count: discarded,
                records,
                ..Session::default()
            };
            self.logs.clear();
        }

        self.logs.info(format!(
            "Loaded {} record(s) for batch {} ({} row(s) without an external id discarded)",
            count, batch_id, discarded
        ));
        Ok(batch_id)
    }

    /// Reset to the initial empty session
    pub fn clear(&self) -> Result<()> {
        let mut session = self.session.write();
        if session.is_processing {
            return Err(AutofillError::conflict(
                "cannot clear while a batch is being processed",
            ));
        }
        *session = Session::default();
        self.logs.clear();
        self.stop.lower();
        Ok(())
    }

    /// Atomically claim the session for a new run.
    ///
    /// Nothing is modified when the claim is refused.
    pub fn try_begin(&self) -> Result<BatchTicket> {
        let mut session = self.session.write();
        if session.is_processing {
            return Err(AutofillError::conflict("a batch is already being processed"));
        }
        let Some(batch_id) = session.batch_id.filter(|_| !session.records.is_empty()) else {
            return Err(AutofillError::validation("no records loaded"));
        };
        if !session.has_pending() {
            return Err(AutofillError::validation(
                "every loaded record has already been processed",
            ));
        }

        let pending = session
            .records
            .iter()
            .filter(|record| record.status == RecordStatus::Pending)
            .map(|record| record.sequence_index)
            .collect();

        session.is_processing = true;
        session.current_record = None;
        session.phase = RunnerPhase::Idle;
        session.started_at = Some(Utc::now());
        session.finished_at = None;
        self.stop.lower();

        Ok(BatchTicket { batch_id, pending })
    }

    pub fn set_phase(&self, phase: RunnerPhase) {
        self.session.write().phase = phase;
    }

    /// Move a record to `processing` and make it current
    pub fn mark_processing(&self, index: usize) -> Result<Record> {
        let mut session = self.session.write();
        if let Some(current) = session.current_record {
            return Err(AutofillError::internal(format!(
                "record {} is still processing",
                current
            )));
        }

        let record = session.record_mut(index)?;
        record
            .transition(RecordStatus::Processing, None)
            .map_err(|e| AutofillError::internal(e.to_string()))?;
        let snapshot = record.clone();

        session.current_record = Some(index);
        session.phase = RunnerPhase::Processing { index };
        Ok(snapshot)
    }

    /// Move a record to `completed` or `failed`, counting it exactly once
    pub fn mark_terminal(
        &self,
        index: usize,
        status: RecordStatus,
        error_detail: Option<String>,
    ) -> Result<()> {
        let mut session = self.session.write();
        session
            .record_mut(index)?
            .transition(status, error_detail)
            .map_err(|e| AutofillError::internal(e.to_string()))?;

        session.processed_count += 1;
        if session.current_record == Some(index) {
            session.current_record = None;
        }
        Ok(())
    }

    /// Fail whatever record is in flight; used when a run dies mid-record
    pub fn fail_in_flight(&self, reason: &str) -> Option<usize> {
        let index = self.session.read().current_record?;
        self.mark_terminal(index, RecordStatus::Failed, Some(reason.to_string()))
            .ok()
            .map(|_| index)
    }

    /// Release the session after a run, whatever the outcome
    pub fn finish(&self, phase: RunnerPhase) {
        let mut session = self.session.write();
        session.is_processing = false;
        session.current_record = None;
        session.phase = phase;
        session.finished_at = Some(Utc::now());
        self.stop.lower();
    }

    pub fn tally(&self) -> Tally {
        let session = self.session.read();
        session.records.iter().fold(Tally::default(), |mut tally, record| {
            match record.status {
                RecordStatus::Completed => tally.completed += 1,
                RecordStatus::Failed => tally.failed += 1,
                _ => {}
            }
            tally
        })
    }

    /// Snapshot for polling clients
    pub fn status(&self) -> StatusSnapshot {
        let session = self.session.read();
        let current_record = session.current_record.and_then(|index| {
            session
                .records
                .iter()
                .find(|record| record.sequence_index == index)
                .cloned()
        });

        StatusSnapshot {
            batch_id: session.batch_id,
            is_processing: session.is_processing,
            phase: session.phase.clone(),
            stop_requested: self.stop.is_raised(),
            current_record,
            total_count: session.total_count,
            processed_count: session.processed_count,
            progress_percent: progress_percent(session.processed_count, session.total_count),
            discarded_count: session.discarded_count,
            records: session.records.clone(),
            started_at: session.started_at,
            finished_at: session.finished_at,
        }
    }

    /// The newest `limit` log entries, oldest first
    pub fn recent_logs(&self, limit: usize) -> Vec<LogEntry> {
        self.logs.recent(limit)
    }
}
