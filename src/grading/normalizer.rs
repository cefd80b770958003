// src/grading/normalizer.rs

use std::collections::BTreeSet;

use serde_json::Value;

use crate::models::question::QuestionType;

/// A learner's answer in a form that can be compared against an answer key.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedAnswer {
    Unanswered,
    Choices(ChoiceSet),
    Text(TextAnswer),
}

/// Option indices picked on a multiple choice question.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChoiceSet {
    /// In-range indices, deduplicated.
    pub picked: BTreeSet<usize>,
    /// Picks that did not resolve to an option (out of range, negative, not a number).
    pub stray: usize,
    /// The raw answer was an array, i.e. a multi-select.
    pub multi: bool,
}

impl ChoiceSet {
    pub fn is_empty(&self) -> bool {
        self.picked.is_empty() && self.stray == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextAnswer {
    /// As typed, for display.
    pub display: String,
    /// Trimmed and lowercased, for comparison.
    pub key: String,
}

/// Trim + lowercase, the comparison rule for free-text answers.
pub fn comparison_key(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn normalize_answer(
    raw: &Value,
    question_type: QuestionType,
    option_count: usize,
) -> NormalizedAnswer {
    match question_type {
        QuestionType::MultipleChoice => normalize_choices(raw, option_count),
        QuestionType::Identification => normalize_text(raw),
        QuestionType::Unknown => NormalizedAnswer::Unanswered,
    }
}

fn normalize_choices(raw: &Value, option_count: usize) -> NormalizedAnswer {
    let mut choices = ChoiceSet::default();

    match raw {
        Value::Null => return NormalizedAnswer::Unanswered,
        Value::String(s) if s.trim().is_empty() => return NormalizedAnswer::Unanswered,
        Value::Array(items) => {
            choices.multi = true;
            for item in items {
                pick(&mut choices, option_index(item, option_count));
            }
        }
        single => pick(&mut choices, option_index(single, option_count)),
    }

    if choices.is_empty() {
        NormalizedAnswer::Unanswered
    } else {
        NormalizedAnswer::Choices(choices)
    }
}

fn pick(choices: &mut ChoiceSet, index: Option<usize>) {
    match index {
        Some(i) => {
            choices.picked.insert(i);
        }
        None => choices.stray += 1,
    }
}

fn option_index(raw: &Value, option_count: usize) -> Option<usize> {
    let index = match raw {
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    usize::try_from(index).ok().filter(|i| *i < option_count)
}

fn normalize_text(raw: &Value) -> NormalizedAnswer {
    let display = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return NormalizedAnswer::Unanswered,
    };

    let key = comparison_key(&display);
    if key.is_empty() {
        return NormalizedAnswer::Unanswered;
    }
    NormalizedAnswer::Text(TextAnswer { display, key })
}
