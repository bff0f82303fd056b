use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::knowledge::{
    tier_or_novice, KnowledgeKey, KnowledgeRecord, KnowledgeRepository, RepositoryError, Upserted,
};

const SELECT_RECORD: &str = r#"
    SELECT "user_id", "topic", "subtopic", "mastery_score", "status", "revision", "last_updated"
    FROM "user_knowledge"
    WHERE "user_id" = ? AND "topic" = ? AND "subtopic" = ?
    LIMIT 1
"#;

/// `user_knowledge` table behind the repository seam.
#[derive(Clone)]
pub struct SqliteKnowledgeRepository {
    pool: SqlitePool,
}

impl SqliteKnowledgeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KnowledgeRepository for SqliteKnowledgeRepository {
    async fn lookup(&self, key: &KnowledgeKey) -> Result<Option<KnowledgeRecord>, RepositoryError> {
        let row = sqlx::query(SELECT_RECORD)
            .bind(key.user_id)
            .bind(&key.topic)
            .bind(&key.subtopic)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_knowledge_row))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<KnowledgeRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT "user_id", "topic", "subtopic", "mastery_score", "status", "revision", "last_updated"
            FROM "user_knowledge"
            WHERE "user_id" = ?
            ORDER BY "topic" ASC, "subtopic" ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_knowledge_row).collect())
    }

    async fn upsert_with(
        &self,
        key: &KnowledgeKey,
        apply: &(dyn for<'a> Fn(Option<&'a KnowledgeRecord>) -> KnowledgeRecord + Send + Sync),
    ) -> Result<Upserted, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Opening with a write makes SQLite take the write lock up front (honouring
        // busy_timeout), so the read below cannot be invalidated by another writer.
        sqlx::query(
            r#"
            UPDATE "user_knowledge" SET "revision" = "revision"
            WHERE "user_id" = ? AND "topic" = ? AND "subtopic" = ?
            "#,
        )
        .bind(key.user_id)
        .bind(&key.topic)
        .bind(&key.subtopic)
        .execute(&mut *tx)
        .await?;

        let previous = sqlx::query(SELECT_RECORD)
            .bind(key.user_id)
            .bind(&key.topic)
            .bind(&key.subtopic)
            .fetch_optional(&mut *tx)
            .await?
            .as_ref()
            .map(map_knowledge_row);

        let current = apply(previous.as_ref());
        write_record(&mut tx, &current, previous.is_some()).await?;
        tx.commit().await?;

        Ok(Upserted { previous, current })
    }
}

async fn write_record(
    conn: &mut SqliteConnection,
    record: &KnowledgeRecord,
    exists: bool,
) -> Result<(), sqlx::Error> {
    let mastery = i64::from(record.mastery_score);
    let status = record.status().as_str();

    if exists {
        sqlx::query(
            r#"
            UPDATE "user_knowledge"
            SET "mastery_score" = ?, "status" = ?, "revision" = ?, "last_updated" = ?
            WHERE "user_id" = ? AND "topic" = ? AND "subtopic" = ?
            "#,
        )
        .bind(mastery)
        .bind(status)
        .bind(record.revision)
        .bind(record.last_updated)
        .bind(record.key.user_id)
        .bind(&record.key.topic)
        .bind(&record.key.subtopic)
        .execute(conn)
        .await?;
    } else {
        sqlx::query(
            r#"
            INSERT INTO "user_knowledge"
                ("id", "user_id", "topic", "subtopic", "mastery_score", "status", "revision", "last_updated")
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(record.key.user_id)
        .bind(&record.key.topic)
        .bind(&record.key.subtopic)
        .bind(mastery)
        .bind(status)
        .bind(record.revision)
        .bind(record.last_updated)
        .execute(conn)
        .await?;
    }

    Ok(())
}

fn map_knowledge_row(row: &SqliteRow) -> KnowledgeRecord {
    let key = KnowledgeKey {
        user_id: row.try_get("user_id").unwrap_or_default(),
        topic: row.try_get("topic").unwrap_or_default(),
        subtopic: row.try_get("subtopic").unwrap_or_default(),
    };
    let mastery: i64 = row.try_get("mastery_score").unwrap_or(0);
    let record = KnowledgeRecord {
        key,
        mastery_score: mastery.clamp(0, 100) as u8,
        last_updated: row
            .try_get::<DateTime<Utc>, _>("last_updated")
            .unwrap_or_else(|_| Utc::now()),
        revision: row.try_get("revision").unwrap_or(0),
    };

    let stored: Option<String> = row.try_get("status").ok();
    if tier_or_novice(stored.as_deref()) != record.status() {
        tracing::warn!(
            user_id = record.key.user_id,
            topic = %record.key.topic,
            subtopic = %record.key.subtopic,
            stored = ?stored,
            derived = %record.status(),
            "stored status disagrees with mastery score, using derived tier"
        );
    }

    record
}
