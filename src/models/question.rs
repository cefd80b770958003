// src/models/question.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{
    id::ExternalId,
    lenient::{lenient_option_list, lenient_points, lenient_question_type, lenient_string},
};
use crate::utils::html::clean_html;

/// How a question is answered and graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Pick one or more options from `options`; answers are option indices.
    MultipleChoice,
    /// Free-text answer compared case-insensitively.
    Identification,
    /// Anything the exam service sends that this interface does not know.
    /// Always graded as incorrect.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A question as defined on the exam, including its answer key.
///
/// The answer key is captured when the session starts so the interface can
/// still grade locally if the results endpoint is unreachable later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub question_id: ExternalId,

    #[serde(default, deserialize_with = "lenient_string")]
    pub question_text: String,

    /// Mapped from the JSON field 'type' since `type` is a reserved keyword in Rust.
    #[serde(rename = "type", default, deserialize_with = "lenient_question_type")]
    pub question_type: QuestionType,

    /// Display strings, multiple choice only.
    #[serde(default, deserialize_with = "lenient_option_list")]
    pub options: Vec<String>,

    /// Raw answer key: a string, an array, or a brace-encoded array string.
    #[serde(default)]
    pub correct_answer: Option<Value>,

    #[serde(default, deserialize_with = "lenient_points")]
    pub points: f64,
}

/// DTO for sending a question to the learner (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub question_id: ExternalId,
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub points: f64,
}

impl From<&ExamQuestion> for PublicQuestion {
    fn from(question: &ExamQuestion) -> Self {
        Self {
            question_id: question.question_id.clone(),
            question_text: clean_html(&question.question_text),
            question_type: question.question_type,
            options: question.options.iter().map(|o| clean_html(o)).collect(),
            points: question.points,
        }
    }
}
