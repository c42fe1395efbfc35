//! Record model: one incident to create, and its status lifecycle

use serde::{Deserialize, Serialize};
use std::fmt;

/// Incident category; drives which portal status code is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Repair,
    Maintenance,
    Inspection,
    Installation,
    /// Fallback category for absent or unrecognized values
    #[default]
    Other,
}

impl ActionType {
    /// Lenient parse: case-insensitive, ignores spaces, dashes and underscores.
    /// Anything unrecognized maps to [`ActionType::Other`].
    pub fn from_source(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "repair" | "fix" | "corrective" => ActionType::Repair,
            "maintenance" | "preventive" | "preventivemaintenance" => ActionType::Maintenance,
            "inspection" | "check" | "audit" => ActionType::Inspection,
            "installation" | "install" | "setup" => ActionType::Installation,
            _ => ActionType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Repair => "repair",
            ActionType::Maintenance => "maintenance",
            ActionType::Inspection => "inspection",
            ActionType::Installation => "installation",
            ActionType::Other => "other",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-record processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RecordStatus {
    /// `completed` and `failed` are never left once reached
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Completed | RecordStatus::Failed)
    }

    /// Allowed moves: pending → processing → {completed, failed}
    pub fn can_transition_to(&self, next: RecordStatus) -> bool {
        matches!(
            (self, next),
            (RecordStatus::Pending, RecordStatus::Processing)
                | (RecordStatus::Processing, RecordStatus::Completed)
                | (RecordStatus::Processing, RecordStatus::Failed)
        )
    }
}

/// Rejected status change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record {index}: illegal status change {from:?} -> {to:?}")]
pub struct TransitionError {
    pub index: usize,
    pub from: RecordStatus,
    pub to: RecordStatus,
}

/// One parsed unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// 1-based position in the uploaded batch
    pub sequence_index: usize,
    pub action_type: ActionType,
    /// Action type text exactly as uploaded, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_type_raw: Option<String>,
    pub external_id: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl Record {
    /// Create a pending record
    pub fn new(sequence_index: usize, external_id: impl Into<String>) -> Self {
        Self {
            sequence_index,
            action_type: ActionType::default(),
            action_type_raw: None,
            external_id: external_id.into(),
            start_time: String::new(),
            end_time: String::new(),
            comment: None,
            status: RecordStatus::Pending,
            error_detail: None,
        }
    }

    pub fn with_action_type(mut self, raw: &str) -> Self {
        let raw = raw.trim();
        self.action_type = ActionType::from_source(raw);
        self.action_type_raw = (!raw.is_empty()).then(|| raw.to_string());
        self
    }

    pub fn with_times(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_time = start.into();
        self.end_time = end.into();
        self
    }

    /// Blank comments are stored as absent
    pub fn with_comment(mut self, comment: &str) -> Self {
        let comment = comment.trim();
        self.comment = (!comment.is_empty()).then(|| comment.to_string());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, enforcing the monotonic lifecycle.
    ///
    /// `error_detail` is kept only for `failed`.
    pub fn transition(
        &mut self,
        next: RecordStatus,
        error_detail: Option<String>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                index: self.sequence_index,
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.error_detail = match next {
            RecordStatus::Failed => {
                Some(error_detail.unwrap_or_else(|| "unknown failure".to_string()))
            }
            _ => None,
        };
        Ok(())
    }
}
