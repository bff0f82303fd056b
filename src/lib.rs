pub mod config;
pub mod db;
pub mod knowledge;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{Database, DbInitError};
use crate::services::llm_provider::LLMProvider;
use crate::state::AppState;

pub fn build_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Opens the configured database and wires the full application.
pub async fn create_app(config: &Config) -> Result<(axum::Router, Database), DbInitError> {
    let db = Database::connect(&config.db).await?;
    let llm = Arc::new(LLMProvider::new(config.llm.clone()));
    let state = AppState::with_database(db.clone(), llm);
    Ok((build_app(state), db))
}
