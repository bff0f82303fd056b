pub mod knowledge;
pub mod quiz_attempts;
pub mod roadmaps;
pub mod tutor;

pub use knowledge::SqliteKnowledgeRepository;
pub use quiz_attempts::SqliteQuizAttemptRepository;
pub use roadmaps::SqliteRoadmapRepository;
pub use tutor::SqliteTutorRepository;
