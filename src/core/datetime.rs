//! Conversion of uploaded date/time text into the portal's display format

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Spreadsheet serial dates count days from this epoch
fn serial_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Reads uploaded date text with a list of formats and renders it for the portal
#[derive(Debug, Clone)]
pub struct DateConverter {
    input_formats: Vec<String>,
    display_format: String,
}

impl DateConverter {
    pub fn new(input_formats: Vec<String>, display_format: impl Into<String>) -> Self {
        Self {
            input_formats,
            display_format: display_format.into(),
        }
    }

    /// Parse source text. Tries RFC 3339, then each configured format, then a
    /// spreadsheet serial number.
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }

        for format in &self.input_formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(dt);
            }
            // Date-only formats
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return Some(date.and_time(NaiveTime::MIN));
            }
        }

        Self::parse_serial(raw)
    }

    fn parse_serial(raw: &str) -> Option<NaiveDateTime> {
        let serial: f64 = raw.parse().ok()?;
        // Plausible range: 1900-01-01 to 2199-12-31
        if !(1.0..=109_574.0).contains(&serial) {
            return None;
        }
        let seconds = (serial * 86_400.0).round() as i64;
        serial_epoch().checked_add_signed(Duration::seconds(seconds))
    }

    /// Render source text in the display format, or `None` if it cannot be parsed
    pub fn convert(&self, raw: &str) -> Option<String> {
        self.parse(raw)
            .map(|dt| dt.format(&self.display_format).to_string())
    }
}
