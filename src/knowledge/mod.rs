pub mod engine;
pub mod repository;
pub mod routing;
pub mod types;

pub use engine::{is_rushing, smoothed_mastery, KnowledgeError, KnowledgeStateEngine};
pub use repository::{InMemoryKnowledgeRepository, KnowledgeRepository, RepositoryError, Upserted};
pub use routing::{tier_or_novice, InstructionalStrategy, QuestionMix};
pub use types::{KnowledgeKey, KnowledgeRecord, KnowledgeUpdate, StatusTier};
