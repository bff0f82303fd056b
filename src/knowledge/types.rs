use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_MASTERY: u8 = 100;
pub const EXPERT_THRESHOLD: u8 = 80;
pub const COMPETENT_THRESHOLD: u8 = 50;

/// Proficiency tier derived from a mastery score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTier {
    Novice,
    Competent,
    Expert,
}

impl Default for StatusTier {
    fn default() -> Self {
        Self::Novice
    }
}

impl StatusTier {
    pub fn from_mastery(mastery: u8) -> Self {
        if mastery >= EXPERT_THRESHOLD {
            Self::Expert
        } else if mastery >= COMPETENT_THRESHOLD {
            Self::Competent
        } else {
            Self::Novice
        }
    }

    /// Strict parse of a persisted status string. Anything outside the three
    /// tiers is rejected; callers fall back to `Novice`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "novice" => Some(Self::Novice),
            "competent" => Some(Self::Competent),
            "expert" => Some(Self::Expert),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Novice => "novice",
            Self::Competent => "competent",
            Self::Expert => "expert",
        }
    }
}

impl std::fmt::Display for StatusTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique key of a knowledge record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KnowledgeKey {
    pub user_id: i64,
    pub topic: String,
    pub subtopic: String,
}

impl KnowledgeKey {
    pub fn new(user_id: i64, topic: impl Into<String>, subtopic: impl Into<String>) -> Self {
        Self {
            user_id,
            topic: topic.into(),
            subtopic: subtopic.into(),
        }
    }
}

/// Persisted mastery state for one (user, topic, subtopic).
///
/// The tier is not stored on the struct; `status()` derives it from
/// `mastery_score` so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeRecord {
    pub key: KnowledgeKey,
    pub mastery_score: u8,
    pub last_updated: DateTime<Utc>,
    /// Write counter for compare-and-swap. 0 on insert, +1 per update.
    pub revision: i64,
}

impl KnowledgeRecord {
    pub fn status(&self) -> StatusTier {
        StatusTier::from_mastery(self.mastery_score)
    }
}

/// Result of a single engine update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KnowledgeUpdate {
    pub mastery: u8,
    pub status: StatusTier,
    pub previous_mastery: Option<u8>,
    pub rushing_suspected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_at_boundaries() {
        assert_eq!(StatusTier::from_mastery(0), StatusTier::Novice);
        assert_eq!(StatusTier::from_mastery(49), StatusTier::Novice);
        assert_eq!(StatusTier::from_mastery(50), StatusTier::Competent);
        assert_eq!(StatusTier::from_mastery(79), StatusTier::Competent);
        assert_eq!(StatusTier::from_mastery(80), StatusTier::Expert);
        assert_eq!(StatusTier::from_mastery(100), StatusTier::Expert);
    }

    #[test]
    fn parse_rejects_unknown_tiers() {
        assert_eq!(StatusTier::parse("Expert"), Some(StatusTier::Expert));
        assert_eq!(StatusTier::parse(" competent "), Some(StatusTier::Competent));
        assert_eq!(StatusTier::parse("master"), None);
        assert_eq!(StatusTier::parse(""), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&StatusTier::Competent).unwrap();
        assert_eq!(json, "\"competent\"");
    }
}
