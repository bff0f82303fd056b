mod content;
mod health;
mod knowledge;
mod quiz;
mod roadmap;
mod tutor;

use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/quiz", quiz::router())
        .nest("/api/knowledge", knowledge::router())
        .nest("/api/content", content::router())
        .nest("/api/roadmap", roadmap::router())
        .nest("/api/tutor", tutor::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    AppError::not_found("Route not found").into_response()
}
