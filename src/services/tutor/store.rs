use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::TutorMessage;
use crate::knowledge::RepositoryError;

#[async_trait]
pub trait TutorRepository: Send + Sync {
    /// Id of the conversation for (user, topic), created on first use.
    async fn session(&self, user_id: i64, topic: &str) -> Result<i64, RepositoryError>;

    /// Oldest first.
    async fn messages(&self, session_id: i64) -> Result<Vec<TutorMessage>, RepositoryError>;

    /// Appends all of `messages` or none of them.
    async fn append(&self, session_id: i64, messages: &[TutorMessage]) -> Result<(), RepositoryError>;
}

#[derive(Debug, Default)]
struct Conversations {
    sessions: HashMap<(i64, String), i64>,
    messages: HashMap<i64, Vec<TutorMessage>>,
}

#[derive(Debug, Default)]
pub struct InMemoryTutorRepository {
    inner: Mutex<Conversations>,
}

impl InMemoryTutorRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TutorRepository for InMemoryTutorRepository {
    async fn session(&self, user_id: i64, topic: &str) -> Result<i64, RepositoryError> {
        let mut inner = self.inner.lock();
        let next_id = inner.sessions.len() as i64 + 1;
        Ok(*inner
            .sessions
            .entry((user_id, topic.to_string()))
            .or_insert(next_id))
    }

    async fn messages(&self, session_id: i64) -> Result<Vec<TutorMessage>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .messages
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, session_id: i64, messages: &[TutorMessage]) -> Result<(), RepositoryError> {
        self.inner
            .lock()
            .messages
            .entry(session_id)
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }
}
