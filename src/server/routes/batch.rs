//! Batch endpoints
//!
//! Thin handlers over [`BatchController`](crate::core::BatchController).
//! Errors are returned as [`AutofillError`] and rendered by its
//! `ResponseError` implementation.

use crate::core::StartRequest;
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use crate::utils::error::{AutofillError, Result};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Configure batch routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/upload", web::post().to(upload))
            .route("/start", web::post().to(start))
            .route("/stop", web::post().to(stop))
            .route("/status", web::get().to(status))
            .route("/logs", web::get().to(logs))
            .route("/clear", web::post().to(clear)),
    );
}

/// Query parameters for the logs endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    /// Number of newest entries to return
    pub limit: Option<usize>,
}

/// Accept a spreadsheet as multipart field `file`
async fn upload(state: web::Data<AppState>, mut payload: Multipart) -> Result<HttpResponse> {
    let limit = state.config().processing().max_upload_bytes;
    let (bytes, filename) = read_sheet_field(&mut payload, limit).await?;
    info!(
        filename = filename.as_deref().unwrap_or("<unnamed>"),
        size = bytes.len(),
        "Spreadsheet upload received"
    );

    let summary = state.controller.upload(&bytes, filename.as_deref())?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

async fn start(
    state: web::Data<AppState>,
    request: web::Json<StartRequest>,
) -> Result<HttpResponse> {
    let ack = state.controller.start(request.into_inner())?;
    Ok(HttpResponse::Accepted().json(ApiResponse::success(ack)))
}

async fn stop(state: web::Data<AppState>) -> Result<HttpResponse> {
    let ack = state.controller.stop();
    Ok(HttpResponse::Ok().json(ApiResponse::success(ack)))
}

async fn status(state: web::Data<AppState>) -> Result<HttpResponse> {
    debug!("Status requested");
    Ok(HttpResponse::Ok().json(ApiResponse::success(state.controller.status())))
}

async fn logs(state: web::Data<AppState>, query: web::Query<LogsQuery>) -> Result<HttpResponse> {
    let entries = state.controller.logs(query.limit);
    let meta = serde_json::json!({ "count": entries.len() });
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_meta(entries, meta)))
}

async fn clear(state: web::Data<AppState>) -> Result<HttpResponse> {
    state.controller.clear()?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "cleared": true }))))
}

/// Read the `file` field, refusing to buffer more than `limit` bytes
async fn read_sheet_field(
    payload: &mut Multipart,
    limit: usize,
) -> Result<(Vec<u8>, Option<String>)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;

        if field.name() != Some("file") {
            // Skip unknown fields
            while field.next().await.is_some() {}
            continue;
        }

        if let Some(cd) = field.content_disposition() {
            filename = cd.get_filename().map(str::to_string);
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk?;
            if data.len() + bytes.len() > limit {
                warn!(limit, "Upload exceeds size limit");
                return Err(AutofillError::bad_request(format!(
                    "upload exceeds the {} byte limit",
                    limit
                )));
            }
            data.extend_from_slice(&bytes);
        }
        file_data = Some(data);
    }

    match file_data {
        Some(data) if !data.is_empty() => Ok((data, filename)),
        Some(_) => Err(AutofillError::bad_request("uploaded file is empty")),
        None => Err(AutofillError::bad_request("multipart field 'file' is required")),
    }
}
