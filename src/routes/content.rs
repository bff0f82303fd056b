use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::response::{ok, AppError};
use crate::routes::quiz::require_non_empty;
use crate::services::content::ContentRequest;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/generate", post(generate))
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<ContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_non_empty("topic", &request.topic)?;
    require_non_empty("subtopic", &request.subtopic)?;

    let content = state.content().generate(&request).await?;
    Ok(ok(content))
}
