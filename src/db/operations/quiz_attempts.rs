use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::knowledge::RepositoryError;
use crate::services::quiz::{AttemptDetail, QuizAttempt, QuizAttemptRepository};

#[derive(Clone)]
pub struct SqliteQuizAttemptRepository {
    pool: SqlitePool,
}

impl SqliteQuizAttemptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizAttemptRepository for SqliteQuizAttemptRepository {
    async fn insert(&self, attempt: &QuizAttempt) -> Result<(), RepositoryError> {
        let details = serde_json::to_string(&attempt.details)?;

        sqlx::query(
            r#"
            INSERT INTO "quiz_attempts"
                ("id", "user_id", "roadmap_id", "node_label", "topic", "score", "total_questions",
                 "time_taken_seconds", "attempt_data_json", "review_text", "created_at")
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&attempt.id)
        .bind(attempt.user_id)
        .bind(attempt.roadmap_id)
        .bind(&attempt.node_label)
        .bind(&attempt.topic)
        .bind(i64::from(attempt.score))
        .bind(i64::from(attempt.total_questions))
        .bind(i64::from(attempt.time_taken_seconds))
        .bind(details)
        .bind(&attempt.review_text)
        .bind(attempt.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<QuizAttempt>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM "quiz_attempts"
            WHERE "user_id" = ?
            ORDER BY "created_at" DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_attempt_row).collect())
    }
}

fn map_attempt_row(row: &SqliteRow) -> QuizAttempt {
    let details: Vec<AttemptDetail> = row
        .try_get::<String, _>("attempt_data_json")
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();

    QuizAttempt {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("user_id").unwrap_or_default(),
        roadmap_id: row.try_get("roadmap_id").ok().flatten(),
        node_label: row.try_get("node_label").unwrap_or_default(),
        topic: row.try_get("topic").unwrap_or_default(),
        score: row.try_get::<i64, _>("score").unwrap_or(0).clamp(0, 100) as u8,
        total_questions: row.try_get::<i64, _>("total_questions").unwrap_or(0).max(0) as u32,
        time_taken_seconds: row.try_get::<i64, _>("time_taken_seconds").unwrap_or(0).max(0) as u32,
        details,
        review_text: row.try_get("review_text").ok().flatten(),
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .unwrap_or_else(|_| Utc::now()),
    }
}
