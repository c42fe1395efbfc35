//! Spreadsheet intake: uploaded CSV/TSV bytes into an ordered record batch

use crate::core::record::Record;
use crate::utils::error::{AutofillError, Result};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// ZIP container (xlsx) and OLE compound document (xls) signatures
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const WORKBOOK_EXTENSIONS: [&str; 3] = [".xlsx", ".xls", ".xlsm"];

/// Logical columns a sheet may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    ExternalId,
    ActionType,
    StartTime,
    EndTime,
    Comment,
}

impl Column {
    /// Match a normalized header against the known aliases
    fn from_header(normalized: &str) -> Option<Self> {
        let column = match normalized {
            "externalid" | "id" | "incidentid" | "incidentnumber" | "ticket" | "ticketid" => {
                Column::ExternalId
            }
            "actiontype" | "action" | "type" => Column::ActionType,
            "starttime" | "start" | "begin" | "from" => Column::StartTime,
            "endtime" | "end" | "finish" | "to" => Column::EndTime,
            "comment" | "comments" | "remark" | "remarks" | "note" | "notes" => Column::Comment,
            _ => return None,
        };
        Some(column)
    }
}

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parsed upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSheet {
    /// Records in upload order, re-indexed from 1
    pub records: Vec<Record>,
    /// Data rows dropped for lacking an external id
    pub discarded: usize,
}

/// Reject binary workbook uploads early with a useful message
fn reject_workbooks(bytes: &[u8], filename: Option<&str>) -> Result<()> {
    let by_name = filename
        .map(|name| name.to_ascii_lowercase())
        .is_some_and(|name| WORKBOOK_EXTENSIONS.iter().any(|ext| name.ends_with(ext)));

    if by_name || bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        return Err(AutofillError::intake(
            "binary workbooks are not supported; export the sheet as CSV",
        ));
    }
    Ok(())
}

/// Pick the delimiter that occurs most often in the header line
fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    [b',', b';', b'\t']
        .into_iter()
        .max_by_key(|d| header.bytes().filter(|b| b == d).count())
        .unwrap_or(b',')
}

/// Parse an uploaded sheet into an ordered batch.
///
/// Rows without an external id are discarded; the survivors are numbered
/// 1..=n in upload order.
pub fn parse_sheet(bytes: &[u8], filename: Option<&str>) -> Result<ParsedSheet> {
    reject_workbooks(bytes, filename)?;

    let text = std::str::from_utf8(bytes)
        .map_err(|_| AutofillError::intake("spreadsheet is not valid UTF-8 text"))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if text.trim().is_empty() {
        return Err(AutofillError::intake("spreadsheet is empty"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(text))
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut columns: HashMap<Column, usize> = HashMap::new();
    for (position, header) in reader.headers()?.iter().enumerate() {
        if let Some(column) = Column::from_header(&normalize_header(header)) {
            // First matching header wins
            columns.entry(column).or_insert(position);
        }
    }

    let Some(&id_column) = columns.get(&Column::ExternalId) else {
        return Err(AutofillError::intake(
            "spreadsheet has no external id column (expected a header such as \"externalId\" or \"Incident ID\")",
        ));
    };

    let cell = |row: &csv::StringRecord, column: Column| -> String {
        columns
            .get(&column)
            .and_then(|&i| row.get(i))
            .unwrap_or_default()
            .to_string()
    };

    let mut records = Vec::new();
    let mut discarded = 0;

    for row in reader.records() {
        let row = row?;
        if row.iter().all(|value| value.is_empty()) {
            continue;
        }

        let external_id = row.get(id_column).unwrap_or_default();
        if external_id.is_empty() {
            discarded += 1;
            continue;
        }

        let record = Record::new(records.len() + 1, external_id)
            .with_action_type(&cell(&row, Column::ActionType))
            .with_times(cell(&row, Column::StartTime), cell(&row, Column::EndTime))
            .with_comment(&cell(&row, Column::Comment));
        records.push(record);
    }

    debug!(
        records = records.len(),
        discarded, "Parsed spreadsheet upload"
    );

    Ok(ParsedSheet { records, discarded })
}
