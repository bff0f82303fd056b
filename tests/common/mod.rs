#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use edtech_backend::knowledge::{InMemoryKnowledgeRepository, KnowledgeStateEngine};
use edtech_backend::services::llm_provider::{LLMConfig, LLMProvider};
use edtech_backend::services::roadmap::InMemoryRoadmapRepository;
use edtech_backend::state::{AppState, Repositories};

pub fn create_test_app() -> Router {
    edtech_backend::build_app(AppState::in_memory(Arc::new(LLMProvider::disabled())))
}

/// In-memory stores the tests reach into directly.
pub struct TestStores {
    pub knowledge: Arc<InMemoryKnowledgeRepository>,
    pub roadmaps: Arc<InMemoryRoadmapRepository>,
}

/// App plus handles on its stores, for seeding and outage simulation.
pub fn create_test_app_with_stores(llm: LLMProvider) -> (Router, TestStores) {
    let knowledge = Arc::new(InMemoryKnowledgeRepository::new());
    let roadmaps = Arc::new(InMemoryRoadmapRepository::new());
    let repositories = Repositories {
        knowledge: knowledge.clone(),
        roadmaps: roadmaps.clone(),
        ..Repositories::in_memory()
    };
    let state = AppState::new(None, repositories, Arc::new(llm));
    (edtech_backend::build_app(state), TestStores { knowledge, roadmaps })
}

pub fn engine() -> (KnowledgeStateEngine, Arc<InMemoryKnowledgeRepository>) {
    let repo = Arc::new(InMemoryKnowledgeRepository::new());
    (KnowledgeStateEngine::new(repo.clone()), repo)
}

/// OpenAI-compatible server on a local port. Every request body is recorded;
/// the reply content is chosen by `respond` from the system prompt.
pub struct StubLlm {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl StubLlm {
    pub async fn start(respond: fn(&str) -> String) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(body): Json<Value>| {
                let recorded = Arc::clone(&recorded);
                async move {
                    let system = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
                    recorded.lock().push(body);
                    Json(json!({
                        "choices": [{"message": {"role": "assistant", "content": respond(&system)}}]
                    }))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    pub fn provider(&self) -> LLMProvider {
        LLMProvider::new(LLMConfig {
            api_key: None,
            model: "stub-model".to_string(),
            api_endpoint: format!("http://{}/v1", self.addr),
            timeout: Duration::from_secs(5),
            temperature: 0.0,
        })
    }

    /// System prompts received so far, in order.
    pub fn system_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|body| body["messages"][0]["content"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}
