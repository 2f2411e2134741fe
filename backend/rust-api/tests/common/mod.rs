#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use mockexam_api::{
    config::Config,
    create_router,
    models::Exam,
    services::{
        exam_catalog::InMemoryExamCatalog, result_store::InMemoryResultStore, AppState,
    },
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Router backed by in-memory collaborators and a one-second clock.
pub fn create_test_app() -> Router {
    create_test_app_with_tick(1000).0
}

/// Same as [`create_test_app`] with a faster tick so timeouts fire quickly.
pub fn create_test_app_with_tick(timer_tick_ms: u64) -> (Router, Arc<InMemoryResultStore>) {
    create_test_app_with_config(Config {
        timer_tick_ms,
        ..Config::default()
    })
}

pub fn create_test_app_with_config(config: Config) -> (Router, Arc<InMemoryResultStore>) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let results = Arc::new(InMemoryResultStore::new());
    let exams = Arc::new(InMemoryExamCatalog::new(seed_exams()));
    let app_state = Arc::new(AppState::new(config, exams, results.clone()));

    (create_router(app_state), results)
}

fn seed_exams() -> Vec<Exam> {
    let single = |id: &str, correct: usize| {
        json!({
            "id": id,
            "type": "single",
            "prompt": format!("Prompt {}", id),
            "options": ["A", "B", "C", "D"],
            "correct_answer": correct
        })
    };

    let exams = vec![
        json!({
            "_id": "upsc-mock",
            "title": "UPSC Prelims Mock",
            "exam_type": "upsc",
            "duration_seconds": 600,
            "questions": [single("q1", 0), single("q2", 1), single("q3", 2), single("q4", 3)]
        }),
        json!({
            "_id": "mixed-mock",
            "title": "Mixed Format Mock",
            "exam_type": "custom",
            "duration_seconds": 600,
            "questions": [
                {"id": "m1", "type": "multi", "prompt": "Pick primes", "options": ["2", "4", "5", "9"], "correct_answer": [0, 2]},
                {"id": "s1", "type": "short_answer", "prompt": "Longest river in India?", "correct_answer": "Ganga"},
                {"id": "t1", "type": "true_false", "prompt": "The Earth orbits the Sun", "correct_answer": true},
                {"id": "u1", "type": "single", "prompt": "Unkeyed", "options": ["x", "y"]}
            ]
        }),
        json!({
            "_id": "quick-mock",
            "title": "One Second Mock",
            "exam_type": "neet",
            "duration_seconds": 1,
            "questions": [single("k1", 0), single("k2", 1)]
        }),
        json!({
            "_id": "empty-mock",
            "title": "Empty Mock",
            "duration_seconds": 60,
            "questions": []
        }),
    ];

    exams
        .into_iter()
        .map(|raw| serde_json::from_value(raw).expect("seed exam must deserialize"))
        .collect()
}

/// Sends a request and returns status plus JSON body (`Value::Null` when the body is not JSON).
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn start_attempt(app: &Router, exam_id: &str) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/api/v1/attempts",
        Some(json!({ "user_id": "student-1", "exam_id": exam_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "start failed: {}", json);
    json["attempt_id"].as_str().unwrap().to_string()
}

pub async fn answer(app: &Router, attempt_id: &str, action: Value) -> Value {
    let (status, json) = send(
        app,
        "POST",
        &format!("/api/v1/attempts/{}/answers", attempt_id),
        Some(action),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "answer failed: {}", json);
    json
}

pub async fn submit(app: &Router, attempt_id: &str) -> Value {
    let (status, json) = send(
        app,
        "POST",
        &format!("/api/v1/attempts/{}/submit", attempt_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "submit failed: {}", json);
    json
}
