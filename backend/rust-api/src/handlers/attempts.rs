use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    extractors::AppJson,
    models::{
        answer::{AnswerAction, NavigateRequest},
        StartAttemptRequest,
    },
    services::{attempt_service::AttemptError, AppState},
};

fn error_response(e: AttemptError) -> (StatusCode, String) {
    let status = e.status_code();
    if status.is_server_error() {
        tracing::error!("Attempt request failed: {:#}", e);
    } else {
        tracing::debug!("Attempt request rejected: {}", e);
    }
    (status, e.to_string())
}

/// POST /api/v1/attempts
pub async fn start_attempt(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<StartAttemptRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    tracing::info!(
        "Starting attempt for user_id={}, exam_id={}",
        req.user_id,
        req.exam_id
    );

    let response = state
        .attempts
        .start_attempt(req)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/attempts/{id}
pub async fn get_attempt(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let view = state
        .attempts
        .view(&attempt_id)
        .await
        .map_err(error_response)?;
    Ok(Json(view))
}

/// POST /api/v1/attempts/{id}/navigate
pub async fn navigate(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
    AppJson(req): AppJson<NavigateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let view = state
        .attempts
        .navigate(&attempt_id, req)
        .await
        .map_err(error_response)?;
    Ok(Json(view))
}

/// POST /api/v1/attempts/{id}/answers
pub async fn apply_answer(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
    AppJson(action): AppJson<AnswerAction>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let view = state
        .attempts
        .apply(&attempt_id, action)
        .await
        .map_err(error_response)?;
    Ok(Json(view))
}

/// POST /api/v1/attempts/{id}/submit
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Submitting attempt: {}", attempt_id);

    let (review, submitted_now) = state
        .attempts
        .submit(&attempt_id)
        .await
        .map_err(error_response)?;

    if !submitted_now {
        tracing::info!("Attempt {} was already submitted", attempt_id);
    }
    Ok(Json(review))
}

/// GET /api/v1/attempts/{id}/result
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let review = state
        .attempts
        .review(&attempt_id)
        .await
        .map_err(error_response)?;
    Ok(Json(review))
}
