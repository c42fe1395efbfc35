//! HTTP response handling for errors

use super::types::AutofillError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

impl AutofillError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            AutofillError::Config(_) => "CONFIG_ERROR",
            AutofillError::Serialization(_) => "SERIALIZATION_ERROR",
            AutofillError::Yaml(_) => "CONFIG_ERROR",
            AutofillError::Io(_) => "IO_ERROR",
            AutofillError::Intake(_) => "INTAKE_ERROR",
            AutofillError::Validation(_) => "VALIDATION_ERROR",
            AutofillError::BadRequest(_) => "BAD_REQUEST",
            AutofillError::Conflict(_) => "CONFLICT",
            AutofillError::NotFound(_) => "NOT_FOUND",
            AutofillError::Driver(_) => "DRIVER_ERROR",
            AutofillError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AutofillError {
    fn status_code(&self) -> StatusCode {
        match self {
            AutofillError::Intake(_)
            | AutofillError::Validation(_)
            | AutofillError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AutofillError::Conflict(_) => StatusCode::CONFLICT,
            AutofillError::NotFound(_) => StatusCode::NOT_FOUND,
            AutofillError::Driver(_) => StatusCode::BAD_GATEWAY,
            AutofillError::Config(_)
            | AutofillError::Serialization(_)
            | AutofillError::Yaml(_)
            | AutofillError::Io(_)
            | AutofillError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        // Internal details stay in the process log, not in the response body
        let message = match self {
            AutofillError::Serialization(_) | AutofillError::Io(_) => {
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let error_response = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                timestamp: chrono::Utc::now().timestamp(),
                request_id: None,
            },
        };

        HttpResponse::build(status_code).json(error_response)
    }
}

/// Standard error response format
#[derive(serde::Serialize)]
pub struct ErrorResponse {
    /// Always `false`; mirrors the success envelope
    pub success: bool,
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub timestamp: i64,
    pub request_id: Option<String>,
}
