//! Incident form filling
//!
//! Fills the fixed field sequence for one record on an already opened
//! incident, then saves. A field that cannot be found or set is a warning,
//! not a failure; only a missing or refused save fails the record.

use crate::config::{FieldSpec, FormConfig};
use crate::core::datetime::DateConverter;
use crate::core::driver::{DriverResult, PortalDriver};
use crate::core::locator::LocatorResolver;
use crate::core::log_sink::LogSink;
use crate::core::record::Record;

/// Result of filling and saving one incident
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// Saved; `missing_fields` names fields that could not be filled
    Success { missing_fields: Vec<String> },
    /// Not saved
    Failure { reason: String },
}

impl FillOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FillOutcome::Success { .. })
    }
}

/// Fills the incident form from a [`Record`]
#[derive(Debug, Clone)]
pub struct IncidentFormFiller {
    form: FormConfig,
    dates: DateConverter,
}

impl IncidentFormFiller {
    pub fn new(form: FormConfig) -> Self {
        let dates = DateConverter::new(
            form.date_input_formats.clone(),
            form.date_display_format.clone(),
        );
        Self { form, dates }
    }

    /// Fill every field for `record` and save.
    ///
    /// Only fatal driver errors and errors raised by the save click itself
    /// are returned as `Err`.
    pub async fn fill_and_submit(
        &self,
        driver: &dyn PortalDriver,
        logs: &LogSink,
        record: &Record,
    ) -> DriverResult<FillOutcome> {
        let resolver = LocatorResolver::new(driver, logs);
        let fields = &self.form.fields;
        let mut missing = Vec::new();

        let status_code = self.form.status_code_for(record.action_type);
        self.fill_field(&resolver, &fields.status_code, status_code, &mut missing)
            .await?;

        let start = self.date_value(logs, record, &fields.start_time, &record.start_time);
        self.fill_field(&resolver, &fields.start_time, start.as_deref(), &mut missing)
            .await?;

        let end = self.date_value(logs, record, &fields.end_time, &record.end_time);
        self.fill_field(&resolver, &fields.end_time, end.as_deref(), &mut missing)
            .await?;

        if let Some(comment) = &record.comment {
            self.fill_field(&resolver, &fields.comment, Some(comment.as_str()), &mut missing)
                .await?;
        }

        self.fill_field(
            &resolver,
            &fields.action_code,
            Some(self.form.action_code.as_str()),
            &mut missing,
        )
        .await?;

        let Some(save) = resolver.locate("Save", &self.form.save).await? else {
            return Ok(FillOutcome::Failure {
                reason: "save control not found".to_string(),
            });
        };

        if !driver.submit(&save).await? {
            return Ok(FillOutcome::Failure {
                reason: "portal rejected the submission".to_string(),
            });
        }

        if !missing.is_empty() {
            logs.warning(format!(
                "Record {} ({}) saved with missing fields: {}",
                record.sequence_index,
                record.external_id,
                missing.join(", ")
            ));
        }

        Ok(FillOutcome::Success {
            missing_fields: missing,
        })
    }

    async fn fill_field(
        &self,
        resolver: &LocatorResolver<'_>,
        spec: &FieldSpec,
        value: Option<&str>,
        missing: &mut Vec<String>,
    ) -> DriverResult<()> {
        let Some(value) = value else {
            missing.push(spec.label.clone());
            return Ok(());
        };

        let outcome = resolver
            .fill(&spec.label, spec.kind, value, &spec.locators)
            .await?;
        if !outcome.is_filled() {
            missing.push(spec.label.clone());
        }
        Ok(())
    }

    /// Display-formatted date, the raw text if unparseable, `None` if empty
    fn date_value(
        &self,
        logs: &LogSink,
        record: &Record,
        spec: &FieldSpec,
        raw: &str,
    ) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            logs.warning(format!(
                "Record {} ({}) has no value for \"{}\"",
                record.sequence_index, record.external_id, spec.label
            ));
            return None;
        }

        match self.dates.convert(raw) {
            Some(converted) => Some(converted),
            None => {
                logs.warning(format!(
                    "Record {} ({}): could not parse \"{}\" value '{}', submitting as is",
                    record.sequence_index, record.external_id, spec.label, raw
                ));
                Some(raw.to_string())
            }
        }
    }
}
