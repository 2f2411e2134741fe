mod common;

use axum::http::StatusCode;
use common::{answer, create_test_app, create_test_app_with_config, send, start_attempt, submit};
use mockexam_api::config::Config;
use serde_json::json;

#[tokio::test]
async fn test_start_attempt_hides_answer_key() {
    let app = create_test_app();

    let (status, json) = send(
        &app,
        "POST",
        "/api/v1/attempts",
        Some(json!({ "user_id": "student-1", "exam_id": "upsc-mock" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["exam"]["exam_type"], "upsc");
    assert_eq!(json["exam"]["duration_seconds"], 600);
    assert_eq!(json["questions"].as_array().unwrap().len(), 4);
    assert_eq!(json["questions"][0]["type"], "single");
    assert!(json["questions"][0].get("correct_answer").is_none());

    let view = &json["view"];
    assert_eq!(view["phase"], "in_progress");
    assert_eq!(view["current_index"], 0);
    assert_eq!(view["remaining_seconds"], 600);
    assert_eq!(view["statuses"][0], "not_answered");
    assert_eq!(view["statuses"][1], "not_visited");
    assert_eq!(view["palette"]["not_visited"], 3);
}

#[tokio::test]
async fn test_start_attempt_rejects_bad_requests() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/attempts",
        Some(json!({ "user_id": "", "exam_id": "upsc-mock" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        "POST",
        "/api/v1/attempts",
        Some(json!({ "user_id": "student-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["status"], 422);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/attempts",
        Some(json!({ "user_id": "student-1", "exam_id": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/attempts",
        Some(json!({ "user_id": "student-1", "exam_id": "empty-mock" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_attempt_returns_404() {
    let app = create_test_app();

    let (status, _) = send(&app, "GET", "/api/v1/attempts/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/api/v1/attempts/nope/submit", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/v1/attempts/nope/result", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_navigation_stays_in_bounds() {
    let app = create_test_app();
    let id = start_attempt(&app, "upsc-mock").await;
    let uri = format!("/api/v1/attempts/{}/navigate", id);

    let (status, view) = send(&app, "POST", &uri, Some(json!({ "index": 5 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["applied"], false);
    assert_eq!(view["current_index"], 0);

    let (_, view) = send(&app, "POST", &uri, Some(json!({ "direction": "previous" }))).await;
    assert_eq!(view["applied"], false);

    let (_, view) = send(&app, "POST", &uri, Some(json!({ "index": 3 }))).await;
    assert_eq!(view["applied"], true);
    assert_eq!(view["current_index"], 3);
    assert_eq!(view["statuses"][3], "not_answered");

    let (_, view) = send(&app, "POST", &uri, Some(json!({ "direction": "next" }))).await;
    assert_eq!(view["applied"], false);
    assert_eq!(view["current_index"], 3);
}

#[tokio::test]
async fn test_answer_actions_update_palette() {
    let app = create_test_app();
    let id = start_attempt(&app, "upsc-mock").await;

    let view = answer(&app, &id, json!({ "action": "set", "index": 0, "value": 2 })).await;
    assert_eq!(view["applied"], true);
    assert_eq!(view["answers"][0], 2);
    assert_eq!(view["statuses"][0], "answered");

    let view = answer(&app, &id, json!({ "action": "toggle_mark", "index": 0 })).await;
    assert_eq!(view["statuses"][0], "answered_and_marked");

    let view = answer(&app, &id, json!({ "action": "clear", "index": 0 })).await;
    assert!(view["answers"][0].is_null());
    assert_eq!(view["statuses"][0], "marked");

    // Unvisited questions keep their status until the user opens them.
    let view = answer(&app, &id, json!({ "action": "toggle_mark", "index": 2 })).await;
    assert_eq!(view["applied"], true);
    assert_eq!(view["statuses"][2], "not_visited");
    assert_eq!(view["palette"]["marked"], 1);

    // A text answer does not fit a single-choice question.
    let view = answer(&app, &id, json!({ "action": "set", "index": 1, "value": "B" })).await;
    assert_eq!(view["applied"], false);
    assert!(view["answers"][1].is_null());

    let view = answer(&app, &id, json!({ "action": "set", "index": 9, "value": 0 })).await;
    assert_eq!(view["applied"], false);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/attempts/{}/answers", id),
        Some(json!({ "action": "erase", "index": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_scenario_negative_marking_upsc() {
    let app = create_test_app();
    let id = start_attempt(&app, "upsc-mock").await;

    answer(&app, &id, json!({ "action": "set", "index": 0, "value": 0 })).await;
    answer(&app, &id, json!({ "action": "set", "index": 1, "value": 0 })).await;
    answer(&app, &id, json!({ "action": "set", "index": 3, "value": 3 })).await;

    let review = submit(&app, &id).await;
    let score = review["score"].as_f64().unwrap();
    assert!((score - (4.0 - 2.0 / 3.0)).abs() < 1e-9, "score was {}", score);
    assert_eq!(review["correctAnswers"], 2);
    assert_eq!(review["wrongAnswers"], 1);
    assert_eq!(review["unattempted"], 1);
    assert_eq!(review["totalQuestions"], 4);
    assert_eq!(review["status"], "completed");
    assert_eq!(review["outcomes"], json!(["correct", "wrong", "unattempted", "correct"]));
    assert_eq!(review["items"][1]["question"]["correct_answer"], 1);
    assert_eq!(review["items"][1]["answer"], 0);
}

#[tokio::test]
async fn test_scenario_multi_select_is_all_or_nothing() {
    let app = create_test_app();

    let partial = start_attempt(&app, "mixed-mock").await;
    answer(&app, &partial, json!({ "action": "toggle_option", "index": 0, "option": 0 })).await;
    let review = submit(&app, &partial).await;
    assert_eq!(review["outcomes"][0], "wrong");

    let full = start_attempt(&app, "mixed-mock").await;
    answer(&app, &full, json!({ "action": "toggle_option", "index": 0, "option": 2 })).await;
    let view = answer(&app, &full, json!({ "action": "toggle_option", "index": 0, "option": 0 })).await;
    assert_eq!(view["answers"][0], json!([0, 2]));
    let review = submit(&app, &full).await;
    assert_eq!(review["outcomes"][0], "correct");

    let emptied = start_attempt(&app, "mixed-mock").await;
    answer(&app, &emptied, json!({ "action": "toggle_option", "index": 0, "option": 1 })).await;
    answer(&app, &emptied, json!({ "action": "toggle_option", "index": 0, "option": 1 })).await;
    let review = submit(&app, &emptied).await;
    assert_eq!(review["outcomes"][0], "unattempted");
    assert_eq!(review["wrongAnswers"], 0);
}

#[tokio::test]
async fn test_scenario_short_answer_and_true_false() {
    let app = create_test_app();
    let id = start_attempt(&app, "mixed-mock").await;

    answer(&app, &id, json!({ "action": "set", "index": 1, "value": " ganga " })).await;
    answer(&app, &id, json!({ "action": "set", "index": 2, "value": true })).await;
    answer(&app, &id, json!({ "action": "set", "index": 3, "value": 0 })).await;

    let review = submit(&app, &id).await;
    assert_eq!(
        review["outcomes"],
        json!(["unattempted", "correct", "correct", "ungradable"])
    );
    assert_eq!(review["correctAnswers"], 2);
    // Custom exams carry no penalty.
    assert_eq!(review["score"].as_f64().unwrap(), 4.0);
}

#[tokio::test]
async fn test_submit_is_idempotent_and_freezes_attempt() {
    let app = create_test_app();
    let id = start_attempt(&app, "upsc-mock").await;

    let (status, _) = send(&app, "GET", &format!("/api/v1/attempts/{}/result", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    answer(&app, &id, json!({ "action": "set", "index": 0, "value": 0 })).await;
    let first = submit(&app, &id).await;
    let second = submit(&app, &id).await;
    assert_eq!(first["score"], second["score"]);
    assert_eq!(first["submittedAt"], second["submittedAt"]);

    let view = answer(&app, &id, json!({ "action": "set", "index": 1, "value": 1 })).await;
    assert_eq!(view["applied"], false);
    assert_eq!(view["phase"], "submitted");

    let (status, result) =
        send(&app, "GET", &format!("/api/v1/attempts/{}/result", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["attemptId"], id.as_str());
    assert_eq!(result["score"], first["score"]);
    assert_eq!(result["items"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_submitted_attempt_is_served_from_result_store() {
    let (app, results) = create_test_app_with_config(Config {
        attempt_retention_seconds: 0,
        ..Config::default()
    });
    let id = start_attempt(&app, "upsc-mock").await;
    answer(&app, &id, json!({ "action": "set", "index": 0, "value": 0 })).await;
    let first = submit(&app, &id).await;

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["active_attempts"], 0);
    assert_eq!(health["resident_attempts"], 0);

    let (status, result) =
        send(&app, "GET", &format!("/api/v1/attempts/{}/result", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["attemptId"], id.as_str());
    assert_eq!(result["correctAnswers"], 1);
    assert_eq!(result["items"][0]["outcome"], "correct");

    let again = submit(&app, &id).await;
    assert_eq!(again["submittedAt"], first["submittedAt"]);
    assert_eq!(results.len().await, 1);

    // Live state is gone once the attempt leaves memory.
    let (status, _) = send(&app, "GET", &format!("/api/v1/attempts/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
