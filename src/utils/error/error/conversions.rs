//! Type conversions into AutofillError

use super::types::AutofillError;

impl From<csv::Error> for AutofillError {
    fn from(err: csv::Error) -> Self {
        match err.position() {
            Some(pos) => AutofillError::Intake(format!(
                "malformed spreadsheet near line {}: {}",
                pos.line(),
                err
            )),
            None => AutofillError::Intake(format!("malformed spreadsheet: {}", err)),
        }
    }
}

impl From<actix_multipart::MultipartError> for AutofillError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AutofillError::BadRequest(format!("Invalid multipart data: {}", err))
    }
}
