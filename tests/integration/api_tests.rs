//! Request/response behavior of every endpoint

use crate::common::fixtures::{multipart_field, multipart_file, start_body};
use crate::common::{ScriptedFactory, ScriptedPortal, sheet, test_config};
use crate::test_app;
use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use incident_autofill::server::AppState;
use serde_json::Value;
use std::sync::Arc;

fn app_state(portal: ScriptedPortal) -> AppState {
    AppState::new(test_config(), Arc::new(ScriptedFactory::new(portal)))
}

fn upload(filename: &str, content: &[u8]) -> TestRequest {
    let (content_type, body) = multipart_file(filename, content);
    TestRequest::post()
        .uri("/api/upload")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
}

#[actix_web::test]
async fn test_health_reports_ok() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));

    let resp = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["data"]["timestamp"].is_string());
    assert_eq!(body["data"]["isProcessing"], false);
}

#[actix_web::test]
async fn test_version_reports_build_info() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));

    let resp = test::call_service(&app, TestRequest::get().uri("/version").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["version"], incident_autofill::VERSION);
}

#[actix_web::test]
async fn test_upload_returns_parsed_records() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));
    let csv = sheet(&[
        "INC-1,Repair,2024-03-05 08:00,2024-03-05 09:00,pump swapped",
        ",Repair,2024-03-05 08:00,2024-03-05 09:00,no id",
        "INC-2,Inspection,2024-03-06 10:00,2024-03-06 10:30,",
    ]);

    let resp = test::call_service(&app, upload("batch.csv", csv.as_bytes()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["discarded"], 1);
    assert!(body["data"]["batchId"].is_string());

    let records = body["data"]["records"].as_array().unwrap();
    assert_eq!(records[0]["externalId"], "INC-1");
    assert_eq!(records[0]["sequenceIndex"], 1);
    assert_eq!(records[0]["actionType"], "repair");
    assert_eq!(records[0]["status"], "pending");
    assert_eq!(records[1]["externalId"], "INC-2");
    assert_eq!(records[1]["sequenceIndex"], 2);
    assert!(records[1].get("comment").is_none());

    let resp = test::call_service(&app, TestRequest::get().uri("/api/status").to_request()).await;
    let status: Value = test::read_body_json(resp).await;
    assert_eq!(status["data"]["totalCount"], 2);
    assert_eq!(status["data"]["discardedCount"], 1);
    assert_eq!(status["data"]["phase"]["state"], "idle");
}

#[actix_web::test]
async fn test_upload_rejects_binary_workbooks() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));

    let resp = test::call_service(
        &app,
        upload("batch.xlsx", b"PK\x03\x04\x14\x00\x06\x00").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INTAKE_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("CSV"));
}

#[actix_web::test]
async fn test_upload_without_file_field_is_rejected() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));
    let (content_type, body) = multipart_field("attachment", "batch.csv", b"externalId\nA\n");

    let req = TestRequest::post()
        .uri("/api/upload")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[actix_web::test]
async fn test_upload_over_limit_is_rejected() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));
    let rows: Vec<String> = (0..5000)
        .map(|i| format!("INC-{i},repair,2024-03-05 08:00,2024-03-05 09:00,padding text"))
        .collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let csv = sheet(&rows);

    let resp = test::call_service(&app, upload("big.csv", csv.as_bytes()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, TestRequest::get().uri("/api/status").to_request()).await;
    let status: Value = test::read_body_json(resp).await;
    assert_eq!(status["data"]["totalCount"], 0);
}

#[actix_web::test]
async fn test_start_without_records_is_a_validation_error() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));

    let req = TestRequest::post()
        .uri("/api/start")
        .set_json(start_body("operator", "secret", None))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[actix_web::test]
async fn test_start_requires_credentials_and_bounded_delay() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&["INC-1"])));
    let csv = sheet(&["INC-1,repair,2024-03-05 08:00,2024-03-05 09:00,"]);
    test::call_service(&app, upload("batch.csv", csv.as_bytes()).to_request()).await;

    for body in [
        start_body("operator", "", None),
        start_body("", "secret", None),
        start_body("operator", "secret", Some(10_000_000)),
    ] {
        let req = TestRequest::post().uri("/api/start").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let resp = test::call_service(&app, TestRequest::get().uri("/api/status").to_request()).await;
    let status: Value = test::read_body_json(resp).await;
    assert_eq!(status["data"]["isProcessing"], false);
    assert_eq!(status["data"]["records"][0]["status"], "pending");
}

#[actix_web::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));

    let req = TestRequest::post()
        .uri("/api/start")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{\"credentials\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[actix_web::test]
async fn test_stop_when_idle_succeeds() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));

    let resp = test::call_service(&app, TestRequest::post().uri("/api/stop").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["stopRequested"], true);
    assert_eq!(body["data"]["isProcessing"], false);
}

#[actix_web::test]
async fn test_logs_honour_limit() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));
    let csv = sheet(&["INC-1,repair,2024-03-05 08:00,2024-03-05 09:00,"]);
    test::call_service(&app, upload("batch.csv", csv.as_bytes()).to_request()).await;
    test::call_service(&app, TestRequest::post().uri("/api/stop").to_request()).await;

    let resp = test::call_service(&app, TestRequest::get().uri("/api/logs").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    let all = body["data"].as_array().unwrap().len();
    assert!(all >= 1);
    assert_eq!(body["meta"]["count"], all);

    let resp = test::call_service(
        &app,
        TestRequest::get().uri("/api/logs?limit=1").to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0]["severity"].is_string());
    assert!(entries[0]["timestamp"].is_string());

    let resp = test::call_service(
        &app,
        TestRequest::get().uri("/api/logs?limit=lots").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_clear_resets_the_session() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));
    let csv = sheet(&["INC-1,repair,2024-03-05 08:00,2024-03-05 09:00,"]);
    test::call_service(&app, upload("batch.csv", csv.as_bytes()).to_request()).await;

    let resp = test::call_service(&app, TestRequest::post().uri("/api/clear").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["cleared"], true);

    let resp = test::call_service(&app, TestRequest::get().uri("/api/status").to_request()).await;
    let status: Value = test::read_body_json(resp).await;
    assert_eq!(status["data"]["totalCount"], 0);
    assert!(status["data"]["batchId"].is_null());
    assert_eq!(status["data"]["records"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn test_unknown_route_is_not_found() {
    let app = test_app!(app_state(ScriptedPortal::with_incidents(&[])));

    let resp = test::call_service(&app, TestRequest::get().uri("/api/nope").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
