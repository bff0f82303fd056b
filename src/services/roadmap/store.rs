use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;

use super::{Roadmap, RoadmapPlan, RoadmapSummary};
use crate::knowledge::RepositoryError;

#[async_trait]
pub trait RoadmapRepository: Send + Sync {
    /// Stores a new roadmap and returns its id.
    async fn insert(&self, user_id: i64, topic: &str, plan: &RoadmapPlan) -> Result<i64, RepositoryError>;

    async fn get(&self, id: i64) -> Result<Option<Roadmap>, RepositoryError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<RoadmapSummary>, RepositoryError>;

    /// Replaces the saved graph layout. `Ok(false)` when no roadmap has `id`.
    async fn update_layout(&self, id: i64, nodes: Vec<Value>, edges: Vec<Value>) -> Result<bool, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRoadmapRepository {
    roadmaps: Mutex<Vec<Roadmap>>,
}

impl InMemoryRoadmapRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoadmapRepository for InMemoryRoadmapRepository {
    async fn insert(&self, user_id: i64, topic: &str, plan: &RoadmapPlan) -> Result<i64, RepositoryError> {
        let mut roadmaps = self.roadmaps.lock();
        let id = roadmaps.last().map_or(1, |last| last.id + 1);
        roadmaps.push(Roadmap {
            id,
            user_id,
            topic: topic.to_string(),
            plan: plan.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<Roadmap>, RepositoryError> {
        Ok(self.roadmaps.lock().iter().find(|roadmap| roadmap.id == id).cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<RoadmapSummary>, RepositoryError> {
        Ok(self
            .roadmaps
            .lock()
            .iter()
            .rev()
            .filter(|roadmap| roadmap.user_id == user_id)
            .map(|roadmap| RoadmapSummary {
                id: roadmap.id,
                topic: roadmap.topic.clone(),
                language: roadmap.plan.language.clone(),
                difficulty: roadmap.plan.difficulty.clone(),
                created_at: roadmap.created_at,
            })
            .collect())
    }

    async fn update_layout(&self, id: i64, nodes: Vec<Value>, edges: Vec<Value>) -> Result<bool, RepositoryError> {
        let mut roadmaps = self.roadmaps.lock();
        let Some(roadmap) = roadmaps.iter_mut().find(|roadmap| roadmap.id == id) else {
            return Ok(false);
        };
        roadmap.plan.nodes = Some(nodes);
        roadmap.plan.edges = Some(edges);
        Ok(true)
    }
}
