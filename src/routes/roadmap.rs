use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::response::{ok, AppError};
use crate::routes::quiz::require_non_empty;
use crate::services::roadmap::RoadmapRequest;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/user/:user_id", get(list_for_user))
        .route("/:id", get(get_roadmap))
        .route("/:id/update", put(update_layout))
}

#[derive(Debug, Deserialize)]
struct LayoutUpdate {
    nodes: Vec<Value>,
    edges: Vec<Value>,
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<RoadmapRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_non_empty("topic", &request.topic)?;

    let created = state.roadmap().generate(&request).await?;
    Ok(ok(created))
}

async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let roadmaps = state.roadmap().list_for_user(user_id).await?;
    Ok(ok(roadmaps))
}

async fn get_roadmap(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let roadmap = state
        .roadmap()
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Roadmap not found"))?;
    Ok(ok(roadmap))
}

async fn update_layout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<LayoutUpdate>,
) -> Result<impl IntoResponse, AppError> {
    if !state.roadmap().update_layout(id, update.nodes, update.edges).await? {
        return Err(AppError::not_found("Roadmap not found"));
    }
    Ok(ok(json!({ "id": id })))
}
