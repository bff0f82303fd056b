use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::knowledge::{KnowledgeError, KnowledgeKey, KnowledgeStateEngine, StatusTier};
use crate::services::llm_provider::{LLMError, LLMProvider};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
    #[error(transparent)]
    Llm(#[from] LLMError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentRequest {
    #[serde(default)]
    pub user_id: Option<i64>,
    pub topic: String,
    pub subtopic: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedContent {
    pub topic: String,
    pub subtopic: String,
    pub status: StatusTier,
    pub content: String,
}

fn default_difficulty() -> String {
    "beginner".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

/// Lesson text adapted to the learner's tier.
pub struct ContentService {
    engine: Arc<KnowledgeStateEngine>,
    llm: Arc<LLMProvider>,
}

impl ContentService {
    pub fn new(engine: Arc<KnowledgeStateEngine>, llm: Arc<LLMProvider>) -> Self {
        Self { engine, llm }
    }

    pub async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, ContentError> {
        if !self.llm.is_available() {
            return Err(LLMError::NotConfigured("LLM_MODEL").into());
        }

        let status = match request.user_id {
            Some(user_id) => {
                self.engine
                    .status_for(&KnowledgeKey::new(user_id, &request.topic, &request.subtopic))
                    .await?
            }
            None => StatusTier::Novice,
        };

        let system = system_prompt(status, &request.difficulty, &request.language);
        let user = format!(
            "Teach the subtopic '{}' which is part of '{}'.",
            request.subtopic, request.topic
        );
        let content = self.llm.complete_with_system(&system, &user).await?;

        tracing::info!(
            topic = %request.topic,
            subtopic = %request.subtopic,
            status = %status,
            chars = content.len(),
            "content generated"
        );

        Ok(GeneratedContent {
            topic: request.topic.clone(),
            subtopic: request.subtopic.clone(),
            status,
            content,
        })
    }
}

fn system_prompt(status: StatusTier, difficulty: &str, language: &str) -> String {
    let strategy = status.strategy();
    let mut prompt = format!(
        "You are a patient tutor writing a Markdown lesson.\n\
         Target difficulty: {difficulty}\n\
         Learner proficiency: {}\n\
         {}\n",
        status.as_str().to_uppercase(),
        strategy.content_instruction,
    );
    if !strategy.remedial_content {
        prompt.push_str("Do not include introductory or remedial material.\n");
    }
    prompt.push_str(&format!("Write the entire response in {language}."));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_tier_instruction() {
        let prompt = system_prompt(StatusTier::Competent, "intermediate", "German");
        assert!(prompt.contains("COMPETENT"));
        assert!(prompt.contains(StatusTier::Competent.strategy().content_instruction));
        assert!(prompt.ends_with("in German."));
    }

    #[test]
    fn expert_prompt_forbids_remedial_material() {
        assert!(system_prompt(StatusTier::Expert, "advanced", "English").contains("remedial"));
        assert!(!system_prompt(StatusTier::Novice, "beginner", "English").contains("remedial"));
    }
}
