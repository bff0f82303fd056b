//! Model-backed endpoints against a local stub of the chat-completions API.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use edtech_backend::knowledge::{KnowledgeKey, KnowledgeStateEngine, StatusTier};

mod common;

use common::StubLlm;

const ROADMAP_REPLY: &str = r#"Here you go:
{"topic": "Rust", "roadmap": [
    {"id": "1", "label": "Memory", "description": "How Rust manages memory", "children": [
        {"id": "1.1", "label": "Ownership", "description": "Moves and drops", "children": []}
    ]},
    {"id": "2", "label": "Traits", "description": "Shared behaviour", "children": []},
]}"#;

fn canned_reply(system: &str) -> String {
    if system.contains("multiple choice quizzes") {
        r#"```json
[{"id": 1, "question": "What does `move` do?", "options": ["a", "b", "c", "d"], "correct_answer": "a"},]
```"#
            .to_string()
    } else if system.contains("curriculum planner") {
        ROADMAP_REPLY.to_string()
    } else if system.contains("review a student's quiz attempt") {
        "You did well.".to_string()
    } else if system.contains("helping a student learn") {
        "Ownership decides who frees memory.".to_string()
    } else {
        "# Lesson".to_string()
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn perfect_submission(user_id: i64, topic: &str, subtopic: &str) -> Value {
    json!({
        "user_id": user_id,
        "node_label": subtopic,
        "topic": topic,
        "questions": [{"id": 1, "question": "Q", "options": ["x", "y"], "correct_answer": "x"}],
        "answers": {"1": "x"},
        "total_time": 120
    })
}

async fn seed(stores: &common::TestStores, user_id: i64, subtopic: &str, mastery: u8) {
    let engine = KnowledgeStateEngine::new(stores.knowledge.clone());
    engine
        .update(&KnowledgeKey::new(user_id, "Rust", subtopic), mastery, 300)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_quiz_generation_uses_stored_tier() {
    let stub = StubLlm::start(canned_reply).await;
    let (app, stores) = common::create_test_app_with_stores(stub.provider());
    seed(&stores, 7, "Lifetimes", 90).await;

    let request = json!({"user_id": 7, "topic": "Rust", "subtopic": "Lifetimes", "num_questions": 1});
    let (status, body) = send(&app, json_request("POST", "/api/quiz/generate", request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "expert");
    assert_eq!(body["data"]["questions"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["questions"][0]["correct_answer"], "a");

    let prompts = stub.system_prompts();
    assert!(prompts[0].contains(StatusTier::Expert.strategy().quiz_instruction));
    assert!(prompts[0].contains("JSON array of 1 objects"));
}

#[tokio::test]
async fn test_content_generation_uses_stored_tier() {
    let stub = StubLlm::start(canned_reply).await;
    let (app, stores) = common::create_test_app_with_stores(stub.provider());
    seed(&stores, 7, "Traits", 60).await;

    let known = json!({"user_id": 7, "topic": "Rust", "subtopic": "Traits"});
    let (status, body) = send(&app, json_request("POST", "/api/content/generate", known)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "competent");
    assert_eq!(body["data"]["content"], "# Lesson");

    let anonymous = json!({"topic": "Rust", "subtopic": "Traits"});
    let (_, body) = send(&app, json_request("POST", "/api/content/generate", anonymous)).await;
    assert_eq!(body["data"]["status"], "novice");

    let prompts = stub.system_prompts();
    assert!(prompts[0].contains(StatusTier::Competent.strategy().content_instruction));
    assert!(prompts[1].contains(StatusTier::Novice.strategy().content_instruction));
}

#[tokio::test]
async fn test_submission_stores_model_review() {
    let stub = StubLlm::start(canned_reply).await;
    let (app, _) = common::create_test_app_with_stores(stub.provider());

    let (status, body) = send(
        &app,
        json_request("POST", "/api/quiz/submit", perfect_submission(3, "Rust", "Macros")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["review"], "You did well.");

    let (_, body) = send(&app, get("/api/quiz/history/3")).await;
    assert_eq!(body["data"][0]["review_text"], "You did well.");
}

#[tokio::test]
async fn test_generated_roadmap_shows_progress() {
    let stub = StubLlm::start(canned_reply).await;
    let (app, _) = common::create_test_app_with_stores(stub.provider());

    let request = json!({"user_id": 7, "topic": "Rust", "difficulty": "Hard", "objective": "Exam based"});
    let (status, body) = send(&app, json_request("POST", "/api/roadmap/generate", request)).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["roadmap"]["difficulty"], "Hard");
    assert!(stub.system_prompts()[0].contains("Objective: Exam based"));

    send(&app, json_request("POST", "/api/quiz/submit", perfect_submission(7, "Rust", "Ownership"))).await;

    let (status, body) = send(&app, get(&format!("/api/roadmap/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let nodes = &body["data"]["plan"]["roadmap"];
    assert_eq!(nodes[0]["mastery_score"], 0);
    assert_eq!(nodes[0]["status"], "novice");
    assert_eq!(nodes[0]["children"][0]["label"], "Ownership");
    assert_eq!(nodes[0]["children"][0]["mastery_score"], 100);
    assert_eq!(nodes[0]["children"][0]["status"], "expert");
    assert_eq!(nodes[1]["status"], "novice");

    let (_, body) = send(&app, get("/api/roadmap/user/7")).await;
    assert_eq!(body["data"][0]["id"], id);
    assert_eq!(body["data"][0]["topic"], "Rust");
}

#[tokio::test]
async fn test_unusable_roadmap_is_bad_gateway() {
    let stub = StubLlm::start(|_| "I cannot help with that.".to_string()).await;
    let (app, _) = common::create_test_app_with_stores(stub.provider());

    let (status, body) = send(
        &app,
        json_request("POST", "/api/roadmap/generate", json!({"user_id": 1, "topic": "Rust"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "LLM_ERROR");

    let (_, body) = send(&app, get("/api/roadmap/user/1")).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_tutor_conversation_carries_history() {
    let stub = StubLlm::start(canned_reply).await;
    let (app, _) = common::create_test_app_with_stores(stub.provider());
    let chat = |message: &str| json!({"user_id": 7, "topic": "Rust", "message": message});

    let (status, body) = send(&app, json_request("POST", "/api/tutor/chat", chat("What is ownership?"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["response"], "Ownership decides who frees memory.");
    assert_eq!(body["data"]["history"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, json_request("POST", "/api/tutor/chat", chat("And borrowing?"))).await;
    assert_eq!(body["data"]["history"].as_array().unwrap().len(), 4);
    assert_eq!(body["data"]["history"][2]["role"], "user");

    // system prompt, two earlier turns, the new question
    let requests = stub.requests.lock().clone();
    let messages = requests[1]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[1]["content"], "What is ownership?");
    assert_eq!(messages[2]["role"], "assistant");

    let (_, body) = send(&app, get("/api/tutor/history?user_id=7&topic=Rust")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 4);
    let (_, body) = send(&app, get("/api/tutor/history?user_id=7&topic=Go")).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
