use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::knowledge::RepositoryError;
use crate::services::tutor::{TutorMessage, TutorRepository, TutorRole};

#[derive(Clone)]
pub struct SqliteTutorRepository {
    pool: SqlitePool,
}

impl SqliteTutorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TutorRepository for SqliteTutorRepository {
    async fn session(&self, user_id: i64, topic: &str) -> Result<i64, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO "tutor_sessions" ("user_id", "topic", "created_at")
            VALUES (?, ?, ?)
            ON CONFLICT ("user_id", "topic") DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(topic)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar(
            r#"SELECT "id" FROM "tutor_sessions" WHERE "user_id" = ? AND "topic" = ?"#,
        )
        .bind(user_id)
        .bind(topic)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn messages(&self, session_id: i64) -> Result<Vec<TutorMessage>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT "role", "content" FROM "tutor_messages"
            WHERE "session_id" = ?
            ORDER BY "id" ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let role: String = row.try_get("role").ok()?;
                let Some(role) = TutorRole::parse(&role) else {
                    tracing::warn!(session_id, role = %role, "skipping tutor message with unknown role");
                    return None;
                };
                Some(TutorMessage {
                    role,
                    content: row.try_get("content").unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn append(&self, session_id: i64, messages: &[TutorMessage]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO "tutor_messages" ("session_id", "role", "content", "created_at")
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(session_id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
