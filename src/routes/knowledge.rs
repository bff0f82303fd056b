use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::knowledge::{KnowledgeKey, KnowledgeRecord, StatusTier};
use crate::response::{ok, AppError};
use crate::routes::quiz::require_non_empty;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:user_id", get(list_progress))
        .route("/:user_id/:topic/:subtopic", get(get_subtopic))
}

#[derive(Debug, Serialize)]
struct KnowledgeDto {
    topic: String,
    subtopic: String,
    mastery_score: u8,
    status: StatusTier,
    last_updated: DateTime<Utc>,
}

impl From<KnowledgeRecord> for KnowledgeDto {
    fn from(record: KnowledgeRecord) -> Self {
        let status = record.status();
        Self {
            topic: record.key.topic,
            subtopic: record.key.subtopic,
            mastery_score: record.mastery_score,
            status,
            last_updated: record.last_updated,
        }
    }
}

#[derive(Debug, Serialize)]
struct SubtopicStatusDto {
    user_id: i64,
    topic: String,
    subtopic: String,
    mastery_score: Option<u8>,
    status: StatusTier,
}

async fn list_progress(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let records = state.engine().progress_for_user(user_id).await?;
    let data: Vec<KnowledgeDto> = records.into_iter().map(KnowledgeDto::from).collect();
    Ok(ok(data))
}

async fn get_subtopic(
    State(state): State<AppState>,
    Path((user_id, topic, subtopic)): Path<(i64, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    require_non_empty("topic", &topic)?;
    require_non_empty("subtopic", &subtopic)?;

    let key = KnowledgeKey::new(user_id, topic, subtopic);
    let mastery_score = state.engine().mastery_for(&key).await?;

    Ok(ok(SubtopicStatusDto {
        status: mastery_score.map(StatusTier::from_mastery).unwrap_or_default(),
        mastery_score,
        user_id: key.user_id,
        topic: key.topic,
        subtopic: key.subtopic,
    }))
}
