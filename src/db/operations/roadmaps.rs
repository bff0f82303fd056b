use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::knowledge::RepositoryError;
use crate::services::roadmap::{Roadmap, RoadmapPlan, RoadmapRepository, RoadmapSummary};

#[derive(Clone)]
pub struct SqliteRoadmapRepository {
    pool: SqlitePool,
}

impl SqliteRoadmapRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoadmapRepository for SqliteRoadmapRepository {
    async fn insert(&self, user_id: i64, topic: &str, plan: &RoadmapPlan) -> Result<i64, RepositoryError> {
        let document = serde_json::to_string(plan)?;

        let result = sqlx::query(
            r#"
            INSERT INTO "roadmaps"
                ("user_id", "topic", "language", "difficulty", "interest", "objective", "roadmap_json", "created_at")
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(topic)
        .bind(&plan.language)
        .bind(&plan.difficulty)
        .bind(&plan.interest)
        .bind(&plan.objective)
        .bind(document)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> Result<Option<Roadmap>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT "id", "user_id", "topic", "language", "difficulty", "interest", "objective",
                   "roadmap_json", "created_at"
            FROM "roadmaps"
            WHERE "id" = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_roadmap_row).transpose()
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<RoadmapSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT "id", "topic", "language", "difficulty", "created_at"
            FROM "roadmaps"
            WHERE "user_id" = ?
            ORDER BY "created_at" DESC, "id" DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RoadmapSummary {
                id: row.try_get("id").unwrap_or_default(),
                topic: row.try_get("topic").unwrap_or_default(),
                language: row.try_get("language").unwrap_or_default(),
                difficulty: row.try_get("difficulty").unwrap_or_default(),
                created_at: created_at(row),
            })
            .collect())
    }

    async fn update_layout(&self, id: i64, nodes: Vec<Value>, edges: Vec<Value>) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE "roadmaps"
            SET "roadmap_json" = json_set("roadmap_json", '$.nodes', json(?), '$.edges', json(?))
            WHERE "id" = ?
            "#,
        )
        .bind(serde_json::to_string(&nodes)?)
        .bind(serde_json::to_string(&edges)?)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn map_roadmap_row(row: &SqliteRow) -> Result<Roadmap, RepositoryError> {
    let document: String = row.try_get("roadmap_json")?;
    let mut plan: RoadmapPlan = serde_json::from_str(&document)?;

    // older documents may lack these
    if plan.interest.is_none() {
        plan.interest = row.try_get("interest").ok().flatten();
    }
    if plan.objective.is_none() {
        plan.objective = row.try_get("objective").ok().flatten();
    }

    Ok(Roadmap {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        topic: row.try_get("topic")?,
        plan,
        created_at: created_at(row),
    })
}

fn created_at(row: &SqliteRow) -> DateTime<Utc> {
    row.try_get::<DateTime<Utc>, _>("created_at")
        .unwrap_or_else(|_| Utc::now())
}
