pub mod grading;
pub mod parser;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::knowledge::{KnowledgeError, KnowledgeKey, KnowledgeStateEngine, KnowledgeUpdate, RepositoryError, StatusTier};
use crate::services::llm_provider::{LLMError, LLMProvider};

pub use grading::{grade, AttemptDetail, GradedQuiz, QuizQuestion};
pub use parser::parse_questions;
pub use store::{InMemoryQuizAttemptRepository, QuizAttempt, QuizAttemptRepository};

const DEFAULT_QUESTION_COUNT: u32 = 5;
const MAX_QUESTION_COUNT: u32 = 20;

#[derive(Debug, Error)]
pub enum QuizServiceError {
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Llm(#[from] LLMError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizGenerateRequest {
    /// Learner whose tier drives question difficulty; anonymous requests are novice.
    #[serde(default)]
    pub user_id: Option<i64>,
    pub topic: String,
    pub subtopic: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub num_questions: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuiz {
    pub status: StatusTier,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizSubmission {
    pub user_id: i64,
    #[serde(default)]
    pub roadmap_id: Option<i64>,
    /// Subtopic the quiz covered.
    pub node_label: String,
    pub topic: String,
    pub questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub answers: HashMap<String, String>,
    #[serde(default)]
    pub time_taken: HashMap<String, u32>,
    #[serde(default)]
    pub total_time: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub attempt_id: String,
    pub score: u8,
    pub correct_count: u32,
    pub total_questions: u32,
    pub knowledge_update: KnowledgeUpdate,
    pub review: Option<String>,
}

fn default_difficulty() -> String {
    "beginner".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

pub struct QuizService {
    engine: Arc<KnowledgeStateEngine>,
    attempts: Arc<dyn QuizAttemptRepository>,
    llm: Arc<LLMProvider>,
}

impl QuizService {
    pub fn new(
        engine: Arc<KnowledgeStateEngine>,
        attempts: Arc<dyn QuizAttemptRepository>,
        llm: Arc<LLMProvider>,
    ) -> Self {
        Self { engine, attempts, llm }
    }

    /// Grades the submission, folds the score into the learner's knowledge
    /// record for (topic, node_label) and stores the attempt.
    ///
    /// The attempt is only stored once the knowledge update has landed, so a
    /// failed submission leaves no history row behind.
    pub async fn submit(&self, submission: QuizSubmission) -> Result<SubmissionOutcome, QuizServiceError> {
        let graded = grade(&submission.questions, &submission.answers, &submission.time_taken);
        let review = self.review(&submission, &graded).await;

        let key = KnowledgeKey::new(submission.user_id, &submission.topic, &submission.node_label);
        let knowledge_update = self
            .engine
            .update(&key, graded.score_percentage, submission.total_time)
            .await?;

        let attempt = QuizAttempt {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: submission.user_id,
            roadmap_id: submission.roadmap_id,
            node_label: submission.node_label,
            topic: submission.topic,
            score: graded.score_percentage,
            total_questions: graded.total_questions,
            time_taken_seconds: submission.total_time,
            details: graded.details,
            review_text: review.clone(),
            created_at: Utc::now(),
        };
        if let Err(err) = self.attempts.insert(&attempt).await {
            warn!(
                error = %err,
                user_id = attempt.user_id,
                mastery = knowledge_update.mastery,
                "knowledge updated but attempt history write failed"
            );
            return Err(err.into());
        }

        info!(
            attempt_id = %attempt.id,
            user_id = attempt.user_id,
            score = attempt.score,
            status = %knowledge_update.status,
            "quiz submitted"
        );

        Ok(SubmissionOutcome {
            attempt_id: attempt.id,
            score: graded.score_percentage,
            correct_count: graded.correct_count,
            total_questions: graded.total_questions,
            knowledge_update,
            review,
        })
    }

    pub async fn history(&self, user_id: i64, limit: usize) -> Result<Vec<QuizAttempt>, QuizServiceError> {
        Ok(self.attempts.list_for_user(user_id, limit).await?)
    }

    /// Asks the model for questions pitched at the learner's current tier.
    /// Output that cannot be repaired into JSON yields an empty quiz.
    pub async fn generate(&self, request: &QuizGenerateRequest) -> Result<GeneratedQuiz, QuizServiceError> {
        if !self.llm.is_available() {
            return Err(LLMError::NotConfigured("LLM_MODEL").into());
        }

        let status = match request.user_id {
            Some(user_id) => {
                let key = KnowledgeKey::new(user_id, &request.topic, &request.subtopic);
                self.engine.status_for(&key).await?
            }
            None => StatusTier::Novice,
        };

        let count = request
            .num_questions
            .unwrap_or(DEFAULT_QUESTION_COUNT)
            .clamp(1, MAX_QUESTION_COUNT);
        let system = system_prompt(status, &request.difficulty, &request.language, count);
        let user = format!(
            "Create a quiz for the subtopic '{}' which is part of '{}'.",
            request.subtopic, request.topic
        );

        let raw = self.llm.complete_with_system(&system, &user).await?;
        let questions = match parse_questions(&raw) {
            Ok(questions) => questions,
            Err(err) => {
                warn!(error = %err, topic = %request.topic, subtopic = %request.subtopic, "discarding unparseable quiz");
                Vec::new()
            }
        };

        Ok(GeneratedQuiz { status, questions })
    }

    /// Model-written feedback. Absent when no model is configured or the call fails.
    async fn review(&self, submission: &QuizSubmission, graded: &GradedQuiz) -> Option<String> {
        if !self.llm.is_available() {
            return None;
        }

        let details = serde_json::to_string_pretty(&graded.details).unwrap_or_default();
        let system = "You review a student's quiz attempt. Summarize performance, strengths and gaps, \
                      comment on pacing, and suggest what to study next. Address the student as \"you\". \
                      Use Markdown and keep it concise.";
        let user = format!(
            "Topic: {}\nSubtopic: {}\nScore: {}% ({}/{})\nTotal time: {} seconds\n\nAttempt details:\n{}",
            submission.topic,
            submission.node_label,
            graded.score_percentage,
            graded.correct_count,
            graded.total_questions,
            submission.total_time,
            details,
        );

        match self.llm.complete_with_system(system, &user).await {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(error = %err, user_id = submission.user_id, "quiz review unavailable");
                None
            }
        }
    }
}

fn system_prompt(status: StatusTier, difficulty: &str, language: &str, count: u32) -> String {
    format!(
        "You write multiple choice quizzes.\n\
         Target difficulty: {difficulty}\n\
         Learner proficiency: {}\n\
         {}\n\
         Language: {language}\n\
         Return only a JSON array of {count} objects with keys \
         \"id\" (number), \"question\", \"options\" (4 strings), \
         \"correct_answer\" (one of the options, verbatim) and \"explanation\".",
        status.as_str().to_uppercase(),
        status.strategy().quiz_instruction,
    )
}
