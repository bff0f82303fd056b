use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::routes::quiz::require_non_empty;
use crate::services::tutor::TutorChatRequest;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/history", get(history))
        .route("/chat", post(chat))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    user_id: i64,
    topic: String,
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_non_empty("topic", &query.topic)?;

    let messages = state.tutor().history(query.user_id, &query.topic).await?;
    Ok(ok(messages))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<TutorChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_non_empty("topic", &request.topic)?;
    require_non_empty("message", &request.message)?;

    let reply = state.tutor().chat(&request).await?;
    Ok(ok(reply))
}
