//! Learning roadmaps: a model-planned tree of subtopics for one topic, shown
//! with the learner's mastery on every node.

pub mod store;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::knowledge::{KnowledgeError, KnowledgeRecord, KnowledgeStateEngine, RepositoryError, StatusTier};
use crate::services::llm_provider::{LLMError, LLMProvider};
use crate::services::quiz::parser::strip_trailing_commas;

pub use store::{InMemoryRoadmapRepository, RoadmapRepository};

#[derive(Debug, Error)]
pub enum RoadmapError {
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Llm(#[from] LLMError),
    #[error("model returned an unusable roadmap: {0}")]
    MalformedPlan(String),
}

/// One subtopic. `mastery_score` and `status` are filled from the learner's
/// knowledge records when the roadmap is read and are never taken from input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapNode {
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub children: Vec<RoadmapNode>,
    #[serde(default, skip_deserializing)]
    pub mastery_score: u8,
    #[serde(default, skip_deserializing)]
    pub status: StatusTier,
}

/// Roadmap document as planned by the model, plus the editor layout saved by
/// the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapPlan {
    pub topic: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub interest: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    pub roadmap: Vec<RoadmapNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Roadmap {
    pub id: i64,
    pub user_id: i64,
    /// Topic the roadmap was requested for; knowledge records are matched on it.
    pub topic: String,
    pub plan: RoadmapPlan,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapSummary {
    pub id: i64,
    pub topic: String,
    pub language: String,
    pub difficulty: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoadmapRequest {
    pub user_id: i64,
    pub topic: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub interest: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedRoadmap {
    pub id: i64,
    pub roadmap: RoadmapPlan,
}

fn default_difficulty() -> String {
    "Normal".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => id,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

pub struct RoadmapService {
    engine: Arc<KnowledgeStateEngine>,
    roadmaps: Arc<dyn RoadmapRepository>,
    llm: Arc<LLMProvider>,
}

impl RoadmapService {
    pub fn new(
        engine: Arc<KnowledgeStateEngine>,
        roadmaps: Arc<dyn RoadmapRepository>,
        llm: Arc<LLMProvider>,
    ) -> Self {
        Self { engine, roadmaps, llm }
    }

    /// Plans a roadmap with the model and stores it for the user.
    pub async fn generate(&self, request: &RoadmapRequest) -> Result<CreatedRoadmap, RoadmapError> {
        if !self.llm.is_available() {
            return Err(LLMError::NotConfigured("LLM_MODEL").into());
        }

        let system = system_prompt(
            &request.difficulty,
            &request.language,
            request.interest.as_deref(),
            request.objective.as_deref(),
        );
        let user = format!(
            "Topic: {}\nDifficulty: {}\nLanguage: {}",
            request.topic, request.difficulty, request.language
        );
        let raw = self.llm.complete_with_system(&system, &user).await?;

        let mut plan = parse_plan(&raw)?;
        plan.difficulty = request.difficulty.clone();
        plan.language = request.language.clone();
        plan.interest = request.interest.clone();
        plan.objective = request.objective.clone();

        let id = self.roadmaps.insert(request.user_id, &request.topic, &plan).await?;
        info!(
            roadmap_id = id,
            user_id = request.user_id,
            topic = %request.topic,
            nodes = count_nodes(&plan.roadmap),
            "roadmap generated"
        );

        Ok(CreatedRoadmap { id, roadmap: plan })
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<RoadmapSummary>, RoadmapError> {
        Ok(self.roadmaps.list_for_user(user_id).await?)
    }

    /// The stored roadmap with every node carrying the owner's mastery for the
    /// subtopic of the same label. Nodes without a record read as 0 / novice.
    pub async fn get(&self, id: i64) -> Result<Option<Roadmap>, RoadmapError> {
        let Some(mut roadmap) = self.roadmaps.get(id).await? else {
            return Ok(None);
        };

        let records = self.engine.progress_for_user(roadmap.user_id).await?;
        let progress: HashMap<&str, &KnowledgeRecord> = records
            .iter()
            .filter(|record| record.key.topic == roadmap.topic)
            .map(|record| (record.key.subtopic.as_str(), record))
            .collect();
        inject_progress(&mut roadmap.plan.roadmap, &progress);

        Ok(Some(roadmap))
    }

    /// Saves the client's graph layout. `false` when the roadmap does not exist.
    pub async fn update_layout(&self, id: i64, nodes: Vec<Value>, edges: Vec<Value>) -> Result<bool, RoadmapError> {
        let found = self.roadmaps.update_layout(id, nodes, edges).await?;
        if !found {
            warn!(roadmap_id = id, "layout update for unknown roadmap");
        }
        Ok(found)
    }
}

fn inject_progress(nodes: &mut [RoadmapNode], progress: &HashMap<&str, &KnowledgeRecord>) {
    for node in nodes {
        match progress.get(node.label.as_str()) {
            Some(record) => {
                node.mastery_score = record.mastery_score;
                node.status = record.status();
            }
            None => {
                node.mastery_score = 0;
                node.status = StatusTier::Novice;
            }
        }
        inject_progress(&mut node.children, progress);
    }
}

fn count_nodes(nodes: &[RoadmapNode]) -> usize {
    nodes.iter().map(|node| 1 + count_nodes(&node.children)).sum()
}

/// Model output to a plan. Prose around the object and trailing commas are
/// tolerated; a plan without nodes is not.
pub fn parse_plan(raw: &str) -> Result<RoadmapPlan, RoadmapError> {
    let trimmed = raw.trim();
    let object = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => return Err(RoadmapError::MalformedPlan("no JSON object in output".to_string())),
    };

    let plan: RoadmapPlan = serde_json::from_str(&strip_trailing_commas(object))
        .map_err(|err| RoadmapError::MalformedPlan(err.to_string()))?;
    if plan.roadmap.is_empty() {
        return Err(RoadmapError::MalformedPlan("roadmap has no nodes".to_string()));
    }
    Ok(plan)
}

fn system_prompt(difficulty: &str, language: &str, interest: Option<&str>, objective: Option<&str>) -> String {
    format!(
        "You are an expert curriculum planner. Create a hierarchical learning roadmap for the topic.\n\
         Return only a JSON object of the form \
         {{\"topic\": \"...\", \"roadmap\": [{{\"id\": \"1\", \"label\": \"...\", \"description\": \"...\", \
         \"children\": [{{\"id\": \"1.1\", \"label\": \"...\", \"description\": \"...\", \"children\": []}}]}}]}}.\n\
         Break the topic into logical steps, nest subtopics as children and keep descriptions short.\n\
         Match the difficulty: {difficulty}.\n\
         Write labels and descriptions in {language}.\n\
         Learner interest: {} (metaphors are welcome, labels stay technical).\n\
         Objective: {} (exam based means syllabus style, skill based means practical steps).",
        interest.unwrap_or("General"),
        objective.unwrap_or("General Learning"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeKey;

    fn record(subtopic: &str, mastery: u8) -> KnowledgeRecord {
        KnowledgeRecord {
            key: KnowledgeKey::new(1, "Rust", subtopic),
            mastery_score: mastery,
            last_updated: Utc::now(),
            revision: 0,
        }
    }

    const PLAN: &str = r#"Here is your roadmap:
        {"topic": "Rust", "roadmap": [
            {"id": 1, "label": "Basics", "description": "Syntax", "children": [
                {"id": "1.1", "label": "Ownership", "description": "Moves", "status": "guru"},
            ]},
            {"id": "2", "label": "Traits", "description": "Polymorphism"}
        ]}"#;

    #[test]
    fn plan_survives_prose_and_trailing_commas() {
        let plan = parse_plan(PLAN).unwrap();
        assert_eq!(plan.topic, "Rust");
        assert_eq!(plan.difficulty, "Normal");
        assert_eq!(plan.roadmap[0].id, "1");
        assert_eq!(plan.roadmap[0].children[0].label, "Ownership");
        assert_eq!(plan.roadmap[0].children[0].status, StatusTier::Novice);
        assert_eq!(count_nodes(&plan.roadmap), 3);
    }

    #[test]
    fn empty_or_missing_plan_is_rejected() {
        assert!(matches!(parse_plan("sorry, no"), Err(RoadmapError::MalformedPlan(_))));
        assert!(matches!(
            parse_plan(r#"{"topic": "Rust", "roadmap": []}"#),
            Err(RoadmapError::MalformedPlan(_))
        ));
    }

    #[test]
    fn progress_reaches_nested_nodes() {
        let mut plan = parse_plan(PLAN).unwrap();
        let records = [record("Ownership", 85), record("Traits", 55)];
        let progress: HashMap<&str, &KnowledgeRecord> =
            records.iter().map(|r| (r.key.subtopic.as_str(), r)).collect();

        inject_progress(&mut plan.roadmap, &progress);

        assert_eq!(plan.roadmap[0].mastery_score, 0);
        assert_eq!(plan.roadmap[0].status, StatusTier::Novice);
        assert_eq!(plan.roadmap[0].children[0].mastery_score, 85);
        assert_eq!(plan.roadmap[0].children[0].status, StatusTier::Expert);
        assert_eq!(plan.roadmap[1].status, StatusTier::Competent);
    }

    #[test]
    fn prompt_defaults_missing_context() {
        let prompt = system_prompt("Hard", "Spanish", None, Some("Exam based"));
        assert!(prompt.contains("difficulty: Hard"));
        assert!(prompt.contains("in Spanish"));
        assert!(prompt.contains("Learner interest: General"));
        assert!(prompt.contains("Objective: Exam based"));
    }
}
