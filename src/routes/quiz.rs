use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::services::quiz::{QuizGenerateRequest, QuizSubmission};
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/submit", post(submit))
        .route("/history/:user_id", get(history))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<QuizGenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_non_empty("topic", &request.topic)?;
    require_non_empty("subtopic", &request.subtopic)?;

    let quiz = state.quiz().generate(&request).await?;
    Ok(ok(quiz))
}

async fn submit(
    State(state): State<AppState>,
    Json(submission): Json<QuizSubmission>,
) -> Result<impl IntoResponse, AppError> {
    require_non_empty("topic", &submission.topic)?;
    require_non_empty("node_label", &submission.node_label)?;

    let outcome = state.quiz().submit(submission).await?;
    Ok(ok(outcome))
}

async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let attempts = state.quiz().history(user_id, limit).await?;
    Ok(ok(attempts))
}

pub(super) fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}
