//! Digital twin update rule.
//!
//! A quiz attempt moves the learner's mastery for one subtopic towards the
//! observed score with an exponentially weighted moving average:
//!
//! - first attempt: mastery = observed score
//! - later attempts: mastery = trunc(prior * 0.7 + observed * 0.3)
//!
//! The tier is re-derived from the new mastery. The read of the prior record
//! and the write of the new one happen inside a single repository upsert, so
//! two submissions racing on the same key are both applied in some order.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use super::repository::{KnowledgeRepository, RepositoryError};
use super::types::{KnowledgeKey, KnowledgeRecord, KnowledgeUpdate, StatusTier, MAX_MASTERY};

/// Weight of the prior mastery, in tenths.
const PRIOR_WEIGHT: u32 = 7;
/// Weight of the observed score, in tenths.
const OBSERVED_WEIGHT: u32 = 3;

const RUSHING_SCORE_CEILING: u8 = 40;
const RUSHING_TIME_FLOOR_SECS: u32 = 30;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Smoothed mastery after one more observation.
///
/// Integer arithmetic keeps the truncation exact; `(p*7 + o*3) / 10` never
/// exceeds 100 for inputs in range.
pub fn smoothed_mastery(prior: Option<u8>, observed: u8) -> u8 {
    let observed = observed.min(MAX_MASTERY);
    match prior {
        None => observed,
        Some(prior) => {
            let prior = u32::from(prior.min(MAX_MASTERY));
            let blended = (prior * PRIOR_WEIGHT + u32::from(observed) * OBSERVED_WEIGHT) / 10;
            blended as u8
        }
    }
}

/// Low score finished implausibly fast.
///
/// Reported to callers and logged, never fed back into mastery.
pub fn is_rushing(observed_score: u8, time_taken_secs: u32) -> bool {
    observed_score < RUSHING_SCORE_CEILING && time_taken_secs < RUSHING_TIME_FLOOR_SECS
}

pub struct KnowledgeStateEngine {
    repository: Arc<dyn KnowledgeRepository>,
}

impl KnowledgeStateEngine {
    pub fn new(repository: Arc<dyn KnowledgeRepository>) -> Self {
        Self { repository }
    }

    /// Folds one quiz result into the record for `key` and returns the values
    /// that were persisted.
    pub async fn update(
        &self,
        key: &KnowledgeKey,
        observed_score: u8,
        time_taken_secs: u32,
    ) -> Result<KnowledgeUpdate, KnowledgeError> {
        let observed_score = observed_score.min(MAX_MASTERY);
        let rushing_suspected = is_rushing(observed_score, time_taken_secs);
        if rushing_suspected {
            debug!(
                user_id = key.user_id,
                topic = %key.topic,
                subtopic = %key.subtopic,
                observed_score,
                time_taken_secs,
                "rushing signal detected"
            );
        }

        let apply = |prior: Option<&KnowledgeRecord>| KnowledgeRecord {
            key: key.clone(),
            mastery_score: smoothed_mastery(prior.map(|record| record.mastery_score), observed_score),
            last_updated: Utc::now(),
            revision: prior.map_or(0, |record| record.revision + 1),
        };
        let upserted = self.repository.upsert_with(key, &apply).await?;

        let previous_mastery = upserted.previous.as_ref().map(|record| record.mastery_score);
        let mastery = upserted.current.mastery_score;
        let status = upserted.current.status();
        info!(
            user_id = key.user_id,
            topic = %key.topic,
            subtopic = %key.subtopic,
            previous = ?previous_mastery,
            mastery,
            status = %status,
            "knowledge state updated"
        );

        Ok(KnowledgeUpdate {
            mastery,
            status,
            previous_mastery,
            rushing_suspected,
        })
    }

    /// Tier used by content and quiz generators. Missing records are novice.
    pub async fn status_for(&self, key: &KnowledgeKey) -> Result<StatusTier, KnowledgeError> {
        Ok(self
            .repository
            .lookup(key)
            .await?
            .map(|record| record.status())
            .unwrap_or_default())
    }

    pub async fn mastery_for(&self, key: &KnowledgeKey) -> Result<Option<u8>, KnowledgeError> {
        Ok(self.repository.lookup(key).await?.map(|record| record.mastery_score))
    }

    pub async fn progress_for_user(&self, user_id: i64) -> Result<Vec<KnowledgeRecord>, KnowledgeError> {
        Ok(self.repository.list_for_user(user_id).await?)
    }
}
