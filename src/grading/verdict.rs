// src/grading/verdict.rs

use crate::grading::{
    GradingPolicy,
    correct_answer::CorrectAnswer,
    normalizer::{ChoiceSet, NormalizedAnswer, comparison_key},
};
use crate::models::{question::QuestionType, results::GradingMode};

/// Outcome of grading one question on this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalVerdict {
    Correct,
    Incorrect,
    /// Not enough information to decide (answer key unknown).
    Undetermined,
}

/// Everything needed to grade one question locally.
#[derive(Debug)]
pub struct GradingInput<'a> {
    pub question_type: QuestionType,
    pub options: &'a [String],
    pub answer: &'a NormalizedAnswer,
    pub accepted: &'a CorrectAnswer,
}

/// Final verdict: a server-asserted correct answer is never downgraded;
/// otherwise a local `Correct` upgrades it.
pub fn merge(server: Option<bool>, local: LocalVerdict) -> bool {
    server == Some(true) || local == LocalVerdict::Correct
}

/// All or nothing.
pub fn points_for(is_correct: bool, points: f64) -> f64 {
    if is_correct { points } else { 0.0 }
}

/// `round(100 * score / total)`, clamped to [0, 100]; 0 when there is nothing to score.
pub fn percentage_of(score: f64, total_points: f64) -> u32 {
    if total_points.is_nan() || total_points <= 0.0 || !score.is_finite() {
        return 0;
    }
    (100.0 * score / total_points).round().clamp(0.0, 100.0) as u32
}

pub fn grade_locally(
    input: &GradingInput<'_>,
    policy: &GradingPolicy,
    mode: GradingMode,
) -> LocalVerdict {
    if input.accepted.is_unknown() {
        return grade_without_key(input, mode);
    }

    let correct = match (input.question_type, input.answer) {
        (QuestionType::MultipleChoice, NormalizedAnswer::Choices(choices)) => {
            if input.accepted.is_multi() {
                multi_choice_correct(choices, input.options, input.accepted.accepted())
            } else {
                single_choice_correct(choices, input.options, input.accepted, policy)
            }
        }
        (QuestionType::Identification, NormalizedAnswer::Text(text)) => input
            .accepted
            .accepted()
            .iter()
            .any(|value| comparison_key(value) == text.key),
        _ => false,
    };

    if correct {
        LocalVerdict::Correct
    } else {
        LocalVerdict::Incorrect
    }
}

/// Lenient heuristic used only when grading entirely offline: a non-empty
/// multi-select on a question with no answer key counts as correct.
fn grade_without_key(input: &GradingInput<'_>, mode: GradingMode) -> LocalVerdict {
    match (mode, input.question_type, input.answer) {
        (GradingMode::Fallback, QuestionType::MultipleChoice, NormalizedAnswer::Choices(choices))
            if choices.multi && !choices.is_empty() =>
        {
            LocalVerdict::Correct
        }
        (GradingMode::Fallback, _, _) => LocalVerdict::Incorrect,
        (GradingMode::Authoritative, _, _) => LocalVerdict::Undetermined,
    }
}

fn picked_texts<'a>(choices: &ChoiceSet, options: &'a [String]) -> Vec<&'a str> {
    choices
        .picked
        .iter()
        .filter_map(|i| options.get(*i).map(String::as_str))
        .collect()
}

/// At least one accepted option picked, and no option outside the accepted set.
fn multi_choice_correct(choices: &ChoiceSet, options: &[String], accepted: &[String]) -> bool {
    if choices.stray > 0 {
        return false;
    }
    let texts = picked_texts(choices, options);
    !texts.is_empty() && texts.iter().all(|text| accepted.iter().any(|a| a == text))
}

fn single_choice_correct(
    choices: &ChoiceSet,
    options: &[String],
    accepted: &CorrectAnswer,
    policy: &GradingPolicy,
) -> bool {
    if choices.stray > 0 || choices.picked.len() != 1 {
        return false;
    }
    let Some(text) = picked_texts(choices, options).first().copied() else {
        return false;
    };

    match accepted {
        CorrectAnswer::Scalar(value) if policy.legacy_substring_match => {
            !text.is_empty() && value.contains(text)
        }
        CorrectAnswer::Scalar(value) => value.trim() == text.trim(),
        CorrectAnswer::Set(values) => values.len() == 1 && values[0].trim() == text.trim(),
        CorrectAnswer::Unknown => false,
    }
}
