use serde::Serialize;

use super::types::StatusTier;

/// Difficulty mix requested from the quiz generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionMix {
    Recall,
    Mixed,
    Challenging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstructionalStrategy {
    pub tier: StatusTier,
    pub question_mix: QuestionMix,
    pub remedial_content: bool,
    pub content_instruction: &'static str,
    pub quiz_instruction: &'static str,
}

const NOVICE: InstructionalStrategy = InstructionalStrategy {
    tier: StatusTier::Novice,
    question_mix: QuestionMix::Recall,
    remedial_content: true,
    content_instruction: "The learner is a NOVICE. Explain from first principles. \
        Use simple language and many examples. Build a strong foundation.",
    quiz_instruction: "The learner is a NOVICE. Focus on foundational concepts, definitions \
        and basic understanding. Keep questions straightforward.",
};

const COMPETENT: InstructionalStrategy = InstructionalStrategy {
    tier: StatusTier::Competent,
    question_mix: QuestionMix::Mixed,
    remedial_content: true,
    content_instruction: "The learner is COMPETENT. Briefly review the basics, then focus on \
        intermediate concepts and practical application.",
    quiz_instruction: "The learner is COMPETENT. Mix intermediate and advanced questions. \
        Focus on application and analysis.",
};

const EXPERT: InstructionalStrategy = InstructionalStrategy {
    tier: StatusTier::Expert,
    question_mix: QuestionMix::Challenging,
    remedial_content: false,
    content_instruction: "The learner is an EXPERT. Skip the basics. Focus on advanced nuances, \
        edge cases and complex applications.",
    quiz_instruction: "The learner is an EXPERT. Ask challenging questions on deep understanding, \
        edge cases and application. Avoid simple recall questions.",
};

impl StatusTier {
    pub fn strategy(self) -> InstructionalStrategy {
        match self {
            StatusTier::Novice => NOVICE,
            StatusTier::Competent => COMPETENT,
            StatusTier::Expert => EXPERT,
        }
    }
}

/// Tier for a stored status string; unknown or missing values route as novice.
pub fn tier_or_novice(stored: Option<&str>) -> StatusTier {
    stored.and_then(StatusTier::parse).unwrap_or_default()
}
