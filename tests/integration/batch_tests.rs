//! Whole batches driven through the HTTP API

use crate::common::fixtures::{multipart_file, start_body};
use crate::common::{ScriptedFactory, ScriptedPortal, sheet, test_config, wait_until};
use crate::test_app;
use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use incident_autofill::RunnerPhase;
use incident_autofill::server::AppState;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

fn app_state(factory: &ScriptedFactory) -> AppState {
    AppState::new(test_config(), Arc::new(factory.clone()))
}

fn upload(csv: &str) -> TestRequest {
    let (content_type, body) = multipart_file("batch.csv", csv.as_bytes());
    TestRequest::post()
        .uri("/api/upload")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
}

fn start(delay_ms: Option<u64>) -> TestRequest {
    TestRequest::post()
        .uri("/api/start")
        .set_json(start_body("operator", "secret", delay_ms))
}

fn log_messages(state: &AppState) -> Vec<String> {
    state
        .controller
        .logs(None)
        .into_iter()
        .map(|entry| entry.message)
        .collect()
}

#[actix_web::test]
async fn test_batch_runs_to_completion() {
    let portal = ScriptedPortal::with_incidents(&["INC-1", "INC-2"]);
    let factory = ScriptedFactory::new(portal.clone());
    let state = app_state(&factory);
    let app = test_app!(state.clone());

    let csv = sheet(&[
        "INC-1,Repair,2024-03-05 08:00,2024-03-05 09:15,pump swapped",
        "INC-404,Repair,2024-03-05 10:00,2024-03-05 11:00,unknown incident",
        "INC-2,Maintenance,06.03.2024 13:00,06.03.2024 14:00,",
    ]);
    let resp = test::call_service(&app, upload(&csv).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, start(None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["queued"], 3);

    assert_eq!(state.controller.join().await, Some(RunnerPhase::Completed));

    let resp = test::call_service(&app, TestRequest::get().uri("/api/status").to_request()).await;
    let status: Value = test::read_body_json(resp).await;
    let data = &status["data"];
    assert_eq!(data["isProcessing"], false);
    assert_eq!(data["phase"]["state"], "completed");
    assert_eq!(data["processedCount"], 3);
    assert_eq!(data["progressPercent"], 100);
    assert!(data["currentRecord"].is_null());
    assert_eq!(data["records"][0]["status"], "completed");
    assert_eq!(data["records"][1]["status"], "failed");
    assert_eq!(data["records"][1]["errorDetail"], "target not found: INC-404");
    assert_eq!(data["records"][2]["status"], "completed");

    let saved = portal.saved();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].external_id, "INC-1");
    assert_eq!(saved[0].field("#status"), Some("REP"));
    assert_eq!(saved[0].field("#start"), Some("05.03.2024 08:00"));
    assert_eq!(saved[0].field("#end"), Some("05.03.2024 09:15"));
    assert_eq!(saved[0].field("#comment"), Some("pump swapped"));
    assert_eq!(saved[0].field("#action"), Some("AUTO"));
    assert_eq!(saved[1].external_id, "INC-2");
    assert_eq!(saved[1].field("#status"), Some("MNT"));
    assert_eq!(saved[1].field("#comment"), None);

    assert_eq!(portal.logins(), vec!["operator".to_string()]);
    assert_eq!(portal.closed(), 1);
    assert!(
        log_messages(&state)
            .iter()
            .any(|m| m == "Batch completed: 2 completed, 1 failed")
    );
}

#[actix_web::test]
async fn test_active_batch_blocks_mutations_and_stop_resumes_later() {
    let portal = ScriptedPortal::with_incidents(&["INC-1", "INC-2", "INC-3"]);
    let factory = ScriptedFactory::new(portal.clone());
    let state = app_state(&factory);
    let app = test_app!(state.clone());

    let csv = sheet(&[
        "INC-1,repair,2024-03-05 08:00,2024-03-05 09:00,",
        "INC-2,repair,2024-03-05 08:00,2024-03-05 09:00,",
        "INC-3,repair,2024-03-05 08:00,2024-03-05 09:00,",
    ]);
    test::call_service(&app, upload(&csv).to_request()).await;

    let resp = test::call_service(&app, start(Some(60_000)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let controller = Arc::clone(&state.controller);
    assert!(
        wait_until(Duration::from_secs(5), || controller.status().processed_count >= 1).await
    );

    let resp = test::call_service(&app, start(Some(0)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "CONFLICT");

    let resp = test::call_service(&app, upload(&csv).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let resp = test::call_service(&app, TestRequest::post().uri("/api/clear").to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = test::call_service(&app, TestRequest::post().uri("/api/stop").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["stopRequested"], true);
    assert_eq!(body["data"]["isProcessing"], true);

    // The 60s pause is cut short by the stop request
    let phase = tokio::time::timeout(Duration::from_secs(5), state.controller.join())
        .await
        .unwrap();
    assert_eq!(phase, Some(RunnerPhase::Stopped));

    let status = state.controller.status();
    assert!(!status.is_processing);
    assert_eq!(status.processed_count, 1);
    assert_eq!(portal.closed(), 1);

    // A fresh start only picks up what is still pending
    let resp = test::call_service(&app, start(Some(0)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["queued"], 2);

    assert_eq!(state.controller.join().await, Some(RunnerPhase::Completed));
    let saved: Vec<String> = portal.saved().into_iter().map(|s| s.external_id).collect();
    assert_eq!(saved, vec!["INC-1", "INC-2", "INC-3"]);
    assert_eq!(factory.launches(), 2);
    assert_eq!(portal.closed(), 2);

    let resp = test::call_service(&app, start(Some(0)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_rejected_login_aborts_without_touching_records() {
    let portal = ScriptedPortal::with_incidents(&["INC-1"]).rejecting_login();
    let factory = ScriptedFactory::new(portal.clone());
    let state = app_state(&factory);
    let app = test_app!(state.clone());

    let csv = sheet(&["INC-1,repair,2024-03-05 08:00,2024-03-05 09:00,"]);
    test::call_service(&app, upload(&csv).to_request()).await;
    let resp = test::call_service(&app, start(None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let phase = state.controller.join().await;
    assert!(matches!(
        phase,
        Some(RunnerPhase::Aborted { ref reason }) if reason.contains("authentication")
    ));

    let resp = test::call_service(&app, TestRequest::get().uri("/api/status").to_request()).await;
    let status: Value = test::read_body_json(resp).await;
    assert_eq!(status["data"]["phase"]["state"], "aborted");
    assert_eq!(status["data"]["records"][0]["status"], "pending");
    assert_eq!(status["data"]["processedCount"], 0);
    assert!(portal.saved().is_empty());
    assert_eq!(portal.closed(), 1);
}

#[actix_web::test]
async fn test_lost_browser_session_fails_in_flight_record_and_cleans_up() {
    let portal =
        ScriptedPortal::with_incidents(&["INC-1", "INC-2", "INC-3"]).losing_session_on("INC-2");
    let factory = ScriptedFactory::new(portal.clone());
    let state = app_state(&factory);
    let app = test_app!(state.clone());

    let csv = sheet(&[
        "INC-1,repair,2024-03-05 08:00,2024-03-05 09:00,",
        "INC-2,repair,2024-03-05 08:00,2024-03-05 09:00,",
        "INC-3,repair,2024-03-05 08:00,2024-03-05 09:00,",
    ]);
    test::call_service(&app, upload(&csv).to_request()).await;
    test::call_service(&app, start(None).to_request()).await;

    assert!(matches!(
        state.controller.join().await,
        Some(RunnerPhase::Aborted { .. })
    ));

    let status = state.controller.status();
    assert!(!status.is_processing);
    assert!(status.current_record.is_none());
    let statuses: Vec<_> = status.records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            incident_autofill::RecordStatus::Completed,
            incident_autofill::RecordStatus::Failed,
            incident_autofill::RecordStatus::Pending,
        ]
    );
    assert!(
        status.records[1]
            .error_detail
            .as_deref()
            .is_some_and(|d| d.contains("browser session lost"))
    );
    assert_eq!(portal.closed(), 1);
}

#[actix_web::test]
async fn test_missing_optional_control_still_saves() {
    let portal = ScriptedPortal::with_incidents(&["INC-1"]).without_control("#comment");
    let factory = ScriptedFactory::new(portal.clone());
    let state = app_state(&factory);
    let app = test_app!(state.clone());

    let csv = sheet(&["INC-1,inspection,2024-03-05 08:00,2024-03-05 09:00,left a note"]);
    test::call_service(&app, upload(&csv).to_request()).await;
    test::call_service(&app, start(None).to_request()).await;

    assert_eq!(state.controller.join().await, Some(RunnerPhase::Completed));
    let saved = portal.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].field("#status"), Some("INS"));
    assert_eq!(saved[0].field("#comment"), None);

    let logs = log_messages(&state);
    assert!(
        logs.iter()
            .any(|m| m.contains("saved with missing fields") && m.contains("Comment"))
    );
}
