//! HTTP API tests against the router, with the built-in scheme index

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use udyami_agent::ConversationEngine;
use udyami_config::Settings;
use udyami_rag::InMemorySchemeIndex;
use udyami_server::{create_router, AppState};

const FULL_PROFILE: &str = "manufacturing, started 2021, turnover 80 lakh, Udyam yes GST no, \
     need 20 lakh for machinery, no collateral, Pune Maharashtra, general category";

fn app() -> Router {
    let index = InMemorySchemeIndex::builtin().unwrap();
    let engine = ConversationEngine::from_settings(&Settings::default(), Arc::new(index)).unwrap();
    create_router(AppState::new(Settings::default(), Arc::new(engine)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send(app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_first_turn_asks_one_question() {
    let app = app();
    let id = new_session(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{}/turn", id),
        Some(json!({ "utterance": "I want to know about loan schemes" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "question");
    assert!(body["question"].is_object());
    assert_eq!(body["turn_index"], 0);
}

#[tokio::test]
async fn test_full_profile_gets_recommendation() {
    let app = app();
    let id = new_session(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{}/turn", id),
        Some(json!({ "utterance": FULL_PROFILE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "recommendation");
    assert!(body["scam_alert"].is_string());

    let (status, summary) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["turn_count"], 1);
}

#[tokio::test]
async fn test_empty_utterance_is_bad_request() {
    let app = app();
    let id = new_session(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{}/turn", id),
        Some(json!({ "utterance": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_session() {
    let app = app();
    let (status, _) = send(
        &app,
        "POST",
        "/api/sessions/missing/turn",
        Some(json!({ "utterance": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/sessions/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_snapshot_restore() {
    let app = app();
    let id = new_session(&app).await;
    send(
        &app,
        "POST",
        &format!("/api/sessions/{}/turn", id),
        Some(json!({ "utterance": "we are a manufacturing unit" })),
    )
    .await;

    let (status, snapshot) = send(&app, "GET", &format!("/api/sessions/{}/snapshot", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["version"], 1);

    let (status, restored) = send(
        &app,
        "POST",
        "/api/sessions/restore",
        Some(json!({ "snapshot": snapshot.clone() })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let restored_id = restored["session_id"].as_str().unwrap();
    assert_ne!(restored_id, id);

    let (_, copy) = send(&app, "GET", &format!("/api/sessions/{}/snapshot", restored_id), None).await;
    assert_eq!(copy, snapshot);

    let mut bad = snapshot;
    bad["version"] = json!(99);
    let (status, _) = send(&app, "POST", "/api/sessions/restore", Some(json!({ "snapshot": bad }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scenario_endpoint() {
    let app = app();
    let id = new_session(&app).await;
    send(
        &app,
        "POST",
        &format!("/api/sessions/{}/turn", id),
        Some(json!({ "utterance": FULL_PROFILE })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{}/scenario", id),
        Some(json!({ "slot": "collateralStatus", "utterance": "yes we have property to offer as collateral" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slot"], "collateralStatus");
    assert!(body["score_b"].as_u64().unwrap() >= body["score_a"].as_u64().unwrap());
}

#[tokio::test]
async fn test_delete_session() {
    let app = app();
    let id = new_session(&app).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/sessions/{}/snapshot", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_disabled_without_recorder() {
    let app = app();
    let (status, _) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
