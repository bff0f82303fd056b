use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Multiple-choice question as produced by the generator and echoed back by
/// the client on submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(default)]
    pub id: serde_json::Value,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    /// Key used in the `answers` / `time_taken` maps: numeric ids are keyed by
    /// their decimal text, string ids as-is.
    pub fn answer_key(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptDetail {
    pub question: String,
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub time_taken: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedQuiz {
    pub correct_count: u32,
    pub total_questions: u32,
    pub score_percentage: u8,
    pub details: Vec<AttemptDetail>,
}

pub fn grade(
    questions: &[QuizQuestion],
    answers: &HashMap<String, String>,
    time_taken: &HashMap<String, u32>,
) -> GradedQuiz {
    let details: Vec<AttemptDetail> = questions
        .iter()
        .map(|q| {
            let key = q.answer_key();
            let user_answer = answers.get(&key).cloned();
            AttemptDetail {
                question: q.question.clone(),
                is_correct: user_answer.as_deref() == Some(q.correct_answer.as_str()),
                user_answer,
                correct_answer: q.correct_answer.clone(),
                time_taken: time_taken.get(&key).copied().unwrap_or(0),
            }
        })
        .collect();

    let total_questions = details.len() as u32;
    let correct_count = details.iter().filter(|d| d.is_correct).count() as u32;

    GradedQuiz {
        correct_count,
        total_questions,
        score_percentage: score_percentage(correct_count, total_questions),
        details,
    }
}

/// Truncated percentage; an empty quiz scores 0.
pub fn score_percentage(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    (correct * 100 / u64::from(total)) as u8
}
