//! Lenient decoding of quiz JSON written by a language model.
//!
//! Models wrap the array in prose or code fences, quote-terminate numeric ids
//! and leave trailing commas. The repairs below cover those cases only.

use super::grading::QuizQuestion;

pub fn parse_questions(raw: &str) -> Result<Vec<QuizQuestion>, serde_json::Error> {
    let cleaned = clean_llm_json(raw);
    let mut questions: Vec<QuizQuestion> = serde_json::from_str(&cleaned)?;

    for (index, question) in questions.iter_mut().enumerate() {
        if question.id.is_null() {
            question.id = serde_json::Value::from(index as u64 + 1);
        }
    }

    Ok(questions)
}

pub fn clean_llm_json(raw: &str) -> String {
    let trimmed = raw.trim();
    let array = match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    };
    strip_trailing_commas(&repair_quoted_ids(array))
}

/// `"id": 4"` -> `"id": 4`
fn repair_quoted_ids(input: &str) -> String {
    const NEEDLE: &str = "\"id\":";
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(NEEDLE) {
        let (head, tail) = rest.split_at(pos + NEEDLE.len());
        out.push_str(head);

        let value_start = tail.len() - tail.trim_start().len();
        let digits = tail[value_start..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        let value_end = value_start + digits;

        out.push_str(&tail[..value_end]);
        rest = &tail[value_end..];
        if digits > 0 && rest.starts_with('"') {
            rest = &rest[1..];
        }
    }

    out.push_str(rest);
    out
}

pub(crate) fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some(']') | Some('}')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }

    out
}
