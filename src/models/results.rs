// src/models/results.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{
    id::ExternalId,
    lenient::{
        lenient_bool, lenient_flag, lenient_id, lenient_number, lenient_opt_string,
        lenient_options, lenient_points, lenient_question_type, lenient_string, or_default,
    },
    question::QuestionType,
};

/// Results object returned by the exam service for a sealed submission.
///
/// Decoded leniently: the service does not keep one schema across questions,
/// so a missing, null or oddly typed field falls back to its empty value
/// instead of failing the whole payload. Raw answers stay as JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsPayload {
    #[serde(default, deserialize_with = "or_default")]
    pub exam: PayloadExam,
    #[serde(default, deserialize_with = "or_default")]
    pub submission: PayloadSubmission,
    #[serde(default, deserialize_with = "lenient_questions")]
    pub questions: Vec<PayloadQuestion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadExam {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub exam_id: ExternalId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadSubmission {
    #[serde(default, deserialize_with = "lenient_id")]
    pub submission_id: ExternalId,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_points: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub has_requested_recheck: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadQuestion {
    #[serde(default, deserialize_with = "lenient_id")]
    pub question_id: ExternalId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub question_text: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_question_type")]
    pub question_type: QuestionType,
    #[serde(default, deserialize_with = "lenient_options")]
    pub options: Option<Vec<String>>,
    /// Absent, a scalar string, an array, or a brace-encoded array string.
    #[serde(default)]
    pub correct_answer: Option<Value>,
    #[serde(default)]
    pub student_answer: Value,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_correct: Option<bool>,
    #[serde(default, deserialize_with = "lenient_points")]
    pub points: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub points_earned: Option<f64>,
}

/// Where a verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingMode {
    /// Reconciled against the exam service's results payload.
    Authoritative,
    /// Synthesized locally because no payload could be fetched.
    Fallback,
}

/// Graded view of an exam attempt, handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct Results {
    pub mode: GradingMode,
    pub exam: ExamSummary,
    pub submission: SubmissionSummary,
    pub questions: Vec<GradedQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamSummary {
    pub title: String,
    pub exam_id: ExternalId,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionSummary {
    pub submission_id: ExternalId,
    pub status: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: f64,
    pub total_points: f64,
    pub percentage: u32,
    pub has_requested_recheck: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradedQuestion {
    pub question_id: ExternalId,
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    /// Accepted values; empty when the answer key is unknown.
    pub correct_answer: Vec<String>,
    pub student_answer: Value,
    pub is_correct: bool,
    pub points: f64,
    pub points_earned: f64,
}

/// Questions that are not objects are skipped; the rest decode field by field.
fn lenient_questions<'de, D>(deserializer: D) -> Result<Vec<PayloadQuestion>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let Value::Array(items) = raw else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| PayloadQuestion::deserialize(item).ok())
        .collect())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc)))
}
