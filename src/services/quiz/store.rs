use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::grading::AttemptDetail;
use crate::knowledge::RepositoryError;

/// One graded quiz submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub user_id: i64,
    pub roadmap_id: Option<i64>,
    pub node_label: String,
    pub topic: String,
    pub score: u8,
    pub total_questions: u32,
    pub time_taken_seconds: u32,
    pub details: Vec<AttemptDetail>,
    pub review_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    async fn insert(&self, attempt: &QuizAttempt) -> Result<(), RepositoryError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<QuizAttempt>, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryQuizAttemptRepository {
    attempts: Mutex<Vec<QuizAttempt>>,
}

impl InMemoryQuizAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn insert(&self, attempt: &QuizAttempt) -> Result<(), RepositoryError> {
        self.attempts.lock().push(attempt.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<QuizAttempt>, RepositoryError> {
        Ok(self
            .attempts
            .lock()
            .iter()
            .rev()
            .filter(|attempt| attempt.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
