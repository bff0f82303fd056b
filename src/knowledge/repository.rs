use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use super::types::{KnowledgeKey, KnowledgeRecord};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Record as it was before a write, and as it was stored.
#[derive(Debug, Clone)]
pub struct Upserted {
    pub previous: Option<KnowledgeRecord>,
    pub current: KnowledgeRecord,
}

/// Storage seam for knowledge records.
#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    async fn lookup(&self, key: &KnowledgeKey) -> Result<Option<KnowledgeRecord>, RepositoryError>;

    /// All records of one user ordered by (topic, subtopic).
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<KnowledgeRecord>, RepositoryError>;

    /// Reads the record for `key`, passes it to `apply` and stores what `apply`
    /// returns, inserting when the key is new.
    ///
    /// No other write to the same key may land between the read and the write.
    /// On error nothing is stored.
    async fn upsert_with(
        &self,
        key: &KnowledgeKey,
        apply: &(dyn for<'a> Fn(Option<&'a KnowledgeRecord>) -> KnowledgeRecord + Send + Sync),
    ) -> Result<Upserted, RepositoryError>;
}

/// Process-local repository used by tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeRepository {
    records: Mutex<BTreeMap<KnowledgeKey, KnowledgeRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryKnowledgeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: every call fails until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeRepository for InMemoryKnowledgeRepository {
    async fn lookup(&self, key: &KnowledgeKey) -> Result<Option<KnowledgeRecord>, RepositoryError> {
        self.check_available()?;
        Ok(self.records.lock().get(key).cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<KnowledgeRecord>, RepositoryError> {
        self.check_available()?;
        Ok(self
            .records
            .lock()
            .values()
            .filter(|record| record.key.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_with(
        &self,
        key: &KnowledgeKey,
        apply: &(dyn for<'a> Fn(Option<&'a KnowledgeRecord>) -> KnowledgeRecord + Send + Sync),
    ) -> Result<Upserted, RepositoryError> {
        self.check_available()?;
        let mut records = self.records.lock();
        let previous = records.get(key).cloned();
        let current = apply(previous.as_ref());
        records.insert(key.clone(), current.clone());
        Ok(Upserted { previous, current })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bump(mastery: u8) -> impl Fn(Option<&KnowledgeRecord>) -> KnowledgeRecord + Send + Sync {
        move |prior| KnowledgeRecord {
            key: prior.map(|r| r.key.clone()).unwrap_or_else(|| KnowledgeKey::new(1, "Rust", "Ownership")),
            mastery_score: mastery,
            last_updated: Utc::now(),
            revision: prior.map_or(0, |r| r.revision + 1),
        }
    }

    #[tokio::test]
    async fn first_write_inserts() {
        let repo = InMemoryKnowledgeRepository::new();
        let key = KnowledgeKey::new(1, "Rust", "Ownership");

        let upserted = repo.upsert_with(&key, &bump(40)).await.unwrap();
        assert!(upserted.previous.is_none());
        assert_eq!(upserted.current.revision, 0);
        assert_eq!(repo.lookup(&key).await.unwrap().unwrap().mastery_score, 40);
    }

    #[tokio::test]
    async fn later_writes_see_the_stored_record() {
        let repo = InMemoryKnowledgeRepository::new();
        let key = KnowledgeKey::new(1, "Rust", "Ownership");
        repo.upsert_with(&key, &bump(40)).await.unwrap();

        let upserted = repo.upsert_with(&key, &bump(50)).await.unwrap();
        assert_eq!(upserted.previous.map(|r| r.mastery_score), Some(40));
        assert_eq!(upserted.current.revision, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn outage_stores_nothing() {
        let repo = InMemoryKnowledgeRepository::new();
        repo.set_unavailable(true);
        let key = KnowledgeKey::new(1, "Rust", "Ownership");
        assert!(repo.upsert_with(&key, &bump(40)).await.is_err());
        repo.set_unavailable(false);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn outage_fails_every_call() {
        let repo = InMemoryKnowledgeRepository::new();
        repo.set_unavailable(true);
        let key = KnowledgeKey::new(1, "Rust", "Traits");
        assert!(matches!(
            repo.lookup(&key).await,
            Err(RepositoryError::Unavailable(_))
        ));
        assert!(repo.list_for_user(1).await.is_err());
    }
}
