use std::sync::Arc;
use std::time::{Instant, SystemTime};

use sqlx::SqlitePool;

use crate::db::operations::{
    SqliteKnowledgeRepository, SqliteQuizAttemptRepository, SqliteRoadmapRepository, SqliteTutorRepository,
};
use crate::db::Database;
use crate::knowledge::{InMemoryKnowledgeRepository, KnowledgeRepository, KnowledgeStateEngine};
use crate::services::content::ContentService;
use crate::services::llm_provider::LLMProvider;
use crate::services::quiz::{InMemoryQuizAttemptRepository, QuizAttemptRepository, QuizService};
use crate::services::roadmap::{InMemoryRoadmapRepository, RoadmapRepository, RoadmapService};
use crate::services::tutor::{InMemoryTutorRepository, TutorRepository, TutorService};

/// Storage behind every service.
#[derive(Clone)]
pub struct Repositories {
    pub knowledge: Arc<dyn KnowledgeRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
    pub roadmaps: Arc<dyn RoadmapRepository>,
    pub tutor: Arc<dyn TutorRepository>,
}

impl Repositories {
    pub fn sqlite(pool: &SqlitePool) -> Self {
        Self {
            knowledge: Arc::new(SqliteKnowledgeRepository::new(pool.clone())),
            attempts: Arc::new(SqliteQuizAttemptRepository::new(pool.clone())),
            roadmaps: Arc::new(SqliteRoadmapRepository::new(pool.clone())),
            tutor: Arc::new(SqliteTutorRepository::new(pool.clone())),
        }
    }

    /// Process-local storage; nothing survives a restart.
    pub fn in_memory() -> Self {
        Self {
            knowledge: Arc::new(InMemoryKnowledgeRepository::new()),
            attempts: Arc::new(InMemoryQuizAttemptRepository::new()),
            roadmaps: Arc::new(InMemoryRoadmapRepository::new()),
            tutor: Arc::new(InMemoryTutorRepository::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db: Option<Database>,
    engine: Arc<KnowledgeStateEngine>,
    quiz: Arc<QuizService>,
    content: Arc<ContentService>,
    roadmap: Arc<RoadmapService>,
    tutor: Arc<TutorService>,
}

impl AppState {
    pub fn new(db: Option<Database>, repositories: Repositories, llm: Arc<LLMProvider>) -> Self {
        let engine = Arc::new(KnowledgeStateEngine::new(repositories.knowledge));
        let quiz = Arc::new(QuizService::new(
            Arc::clone(&engine),
            repositories.attempts,
            Arc::clone(&llm),
        ));
        let content = Arc::new(ContentService::new(Arc::clone(&engine), Arc::clone(&llm)));
        let roadmap = Arc::new(RoadmapService::new(
            Arc::clone(&engine),
            repositories.roadmaps,
            Arc::clone(&llm),
        ));
        let tutor = Arc::new(TutorService::new(repositories.tutor, llm));

        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db,
            engine,
            quiz,
            content,
            roadmap,
            tutor,
        }
    }

    pub fn with_database(db: Database, llm: Arc<LLMProvider>) -> Self {
        let repositories = Repositories::sqlite(db.pool());
        Self::new(Some(db), repositories, llm)
    }

    pub fn in_memory(llm: Arc<LLMProvider>) -> Self {
        Self::new(None, Repositories::in_memory(), llm)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db(&self) -> Option<&Database> {
        self.db.as_ref()
    }

    pub fn engine(&self) -> Arc<KnowledgeStateEngine> {
        Arc::clone(&self.engine)
    }

    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    pub fn content(&self) -> Arc<ContentService> {
        Arc::clone(&self.content)
    }

    pub fn roadmap(&self) -> Arc<RoadmapService> {
        Arc::clone(&self.roadmap)
    }

    pub fn tutor(&self) -> Arc<TutorService> {
        Arc::clone(&self.tutor)
    }
}
