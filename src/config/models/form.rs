//! Incident form configuration

use crate::core::locator::{FieldKind, LocatorKind, LocatorStrategy};
use crate::core::record::ActionType;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One logical form field and how to find it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Human-readable field name used in logs
    pub label: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Tried in order; the first match wins
    pub locators: Vec<LocatorStrategy>,
}

impl FieldSpec {
    pub fn new(label: impl Into<String>, kind: FieldKind, locators: Vec<LocatorStrategy>) -> Self {
        Self {
            label: label.into(),
            kind,
            locators,
        }
    }
}

/// The fixed set of incident form fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormFields {
    #[serde(default = "default_status_code_field")]
    pub status_code: FieldSpec,
    #[serde(default = "default_start_time_field")]
    pub start_time: FieldSpec,
    #[serde(default = "default_end_time_field")]
    pub end_time: FieldSpec,
    #[serde(default = "default_comment_field")]
    pub comment: FieldSpec,
    #[serde(default = "default_action_code_field")]
    pub action_code: FieldSpec,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            status_code: default_status_code_field(),
            start_time: default_start_time_field(),
            end_time: default_end_time_field(),
            comment: default_comment_field(),
            action_code: default_action_code_field(),
        }
    }
}

impl FormFields {
    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        [
            &self.status_code,
            &self.start_time,
            &self.end_time,
            &self.comment,
            &self.action_code,
        ]
        .into_iter()
    }
}

/// Incident form configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Constant written into the action code field of every incident
    #[serde(default = "default_action_code")]
    pub action_code: String,
    /// Category whose status code is used when a record's category is unmapped
    #[serde(default)]
    pub default_action_type: ActionType,
    /// Portal status code per incident category
    #[serde(default = "default_status_codes")]
    pub status_codes: HashMap<ActionType, String>,
    /// `chrono` formats tried, in order, when reading uploaded dates
    #[serde(default = "default_date_input_formats")]
    pub date_input_formats: Vec<String>,
    /// `chrono` format the portal expects
    #[serde(default = "default_date_display_format")]
    pub date_display_format: String,
    #[serde(default)]
    pub fields: FormFields,
    /// Save control candidates
    #[serde(default = "default_save_locators")]
    pub save: Vec<LocatorStrategy>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            action_code: default_action_code(),
            default_action_type: ActionType::default(),
            status_codes: default_status_codes(),
            date_input_formats: default_date_input_formats(),
            date_display_format: default_date_display_format(),
            fields: FormFields::default(),
            save: default_save_locators(),
        }
    }
}

impl FormConfig {
    /// Status code for a category, falling back to the default category
    pub fn status_code_for(&self, action_type: ActionType) -> Option<&str> {
        self.status_codes
            .get(&action_type)
            .or_else(|| self.status_codes.get(&self.default_action_type))
            .map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.action_code.trim().is_empty() {
            return Err("action_code cannot be empty".to_string());
        }
        if self.status_code_for(self.default_action_type).is_none() {
            return Err(format!(
                "status_codes has no entry for the default action type '{}'",
                self.default_action_type
            ));
        }
        if self.date_display_format.trim().is_empty() {
            return Err("date_display_format cannot be empty".to_string());
        }
        for format in std::iter::once(&self.date_display_format).chain(&self.date_input_formats) {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(format!("invalid date format: {}", format));
            }
        }
        for field in self.fields.iter() {
            super::validate_locators(&field.label, &field.locators)?;
        }
        super::validate_locators("save", &self.save)
    }
}

fn default_action_code() -> String {
    "AUTO".to_string()
}

fn default_status_codes() -> HashMap<ActionType, String> {
    HashMap::from([
        (ActionType::Repair, "REP".to_string()),
        (ActionType::Maintenance, "MNT".to_string()),
        (ActionType::Inspection, "INS".to_string()),
        (ActionType::Installation, "INST".to_string()),
        (ActionType::Other, "OTH".to_string()),
    ])
}

fn default_date_input_formats() -> Vec<String> {
    [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
        "%d/%m/%Y %H:%M",
        "%m/%d/%Y %H:%M",
        "%Y-%m-%d",
        "%d.%m.%Y",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_date_display_format() -> String {
    "%d.%m.%Y %H:%M".to_string()
}

fn default_status_code_field() -> FieldSpec {
    FieldSpec::new(
        "Status Code",
        FieldKind::Select,
        vec![
            LocatorStrategy::css("select[name='statusCode']"),
            LocatorStrategy::new(LocatorKind::Id, "statusCode"),
            LocatorStrategy::label("Status Code"),
            LocatorStrategy::new(LocatorKind::AriaLabel, "Status Code"),
        ],
    )
}

fn default_start_time_field() -> FieldSpec {
    FieldSpec::new(
        "Start Time",
        FieldKind::Text,
        vec![
            LocatorStrategy::css("input[name='startTime']"),
            LocatorStrategy::placeholder("Start time"),
            LocatorStrategy::label("Start Time"),
        ],
    )
}

fn default_end_time_field() -> FieldSpec {
    FieldSpec::new(
        "End Time",
        FieldKind::Text,
        vec![
            LocatorStrategy::css("input[name='endTime']"),
            LocatorStrategy::placeholder("End time"),
            LocatorStrategy::label("End Time"),
        ],
    )
}

fn default_comment_field() -> FieldSpec {
    FieldSpec::new(
        "Comment",
        FieldKind::Text,
        vec![
            LocatorStrategy::css("textarea[name='comment']"),
            LocatorStrategy::placeholder("Comment"),
            LocatorStrategy::label("Comment"),
        ],
    )
}

fn default_action_code_field() -> FieldSpec {
    FieldSpec::new(
        "Action Code",
        FieldKind::Text,
        vec![
            LocatorStrategy::css("input[name='actionCode']"),
            LocatorStrategy::label("Action Code"),
        ],
    )
}

fn default_save_locators() -> Vec<LocatorStrategy> {
    vec![
        LocatorStrategy::css("button[type='submit']"),
        LocatorStrategy::xpath("//button[normalize-space(.)='Save']"),
        LocatorStrategy::css("input[type='submit'][value='Save']"),
    ]
}
