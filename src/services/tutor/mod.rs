//! Conversational tutor: one running conversation per (user, topic).

pub mod store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::knowledge::RepositoryError;
use crate::services::llm_provider::{ChatMessage, LLMError, LLMProvider};

pub use store::{InMemoryTutorRepository, TutorRepository};

/// Earlier turns sent along with a new question.
const CONTEXT_MESSAGES: usize = 20;

#[derive(Debug, Error)]
pub enum TutorError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Llm(#[from] LLMError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorRole {
    User,
    Assistant,
}

impl TutorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorMessage {
    pub role: TutorRole,
    pub content: String,
}

impl TutorMessage {
    pub fn new(role: TutorRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

impl From<&TutorMessage> for ChatMessage {
    fn from(message: &TutorMessage) -> Self {
        match message.role {
            TutorRole::User => ChatMessage::user(message.content.as_str()),
            TutorRole::Assistant => ChatMessage::assistant(message.content.as_str()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TutorChatRequest {
    pub user_id: i64,
    pub topic: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TutorReply {
    pub response: String,
    pub history: Vec<TutorMessage>,
}

pub struct TutorService {
    conversations: Arc<dyn TutorRepository>,
    llm: Arc<LLMProvider>,
}

impl TutorService {
    pub fn new(conversations: Arc<dyn TutorRepository>, llm: Arc<LLMProvider>) -> Self {
        Self { conversations, llm }
    }

    pub async fn history(&self, user_id: i64, topic: &str) -> Result<Vec<TutorMessage>, TutorError> {
        let session_id = self.conversations.session(user_id, topic).await?;
        Ok(self.conversations.messages(session_id).await?)
    }

    /// Answers `request.message` in the context of the conversation so far.
    /// The question and the answer are stored together once the model replied.
    pub async fn chat(&self, request: &TutorChatRequest) -> Result<TutorReply, TutorError> {
        if !self.llm.is_available() {
            return Err(LLMError::NotConfigured("LLM_MODEL").into());
        }

        let session_id = self.conversations.session(request.user_id, &request.topic).await?;
        let mut history = self.conversations.messages(session_id).await?;

        let messages = prompt_messages(&request.topic, &history, &request.message);
        let response = self
            .llm
            .chat(&messages)
            .await?
            .first_content()
            .map(str::to_string)
            .ok_or(LLMError::EmptyChoices)?;

        let turn = [
            TutorMessage::new(TutorRole::User, request.message.as_str()),
            TutorMessage::new(TutorRole::Assistant, response.as_str()),
        ];
        self.conversations.append(session_id, &turn).await?;
        history.extend(turn);

        info!(
            user_id = request.user_id,
            topic = %request.topic,
            session_id,
            turns = history.len() / 2,
            "tutor replied"
        );

        Ok(TutorReply { response, history })
    }
}

fn prompt_messages(topic: &str, history: &[TutorMessage], question: &str) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(CONTEXT_MESSAGES);
    let mut messages = Vec::with_capacity(history.len() - start + 2);
    messages.push(ChatMessage::system(format!(
        "You are a friendly, patient tutor helping a student learn {topic}. \
         Answer clearly with short examples, stay on the topic and check understanding \
         with a brief follow-up question. Use Markdown."
    )));
    messages.extend(history[start..].iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(question));
    messages
}
