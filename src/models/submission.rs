// src/models/submission.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    error::AppError,
    models::{exam::ExamDefinition, id::ExternalId, question::PublicQuestion},
};

const MAX_TEXT_ANSWER_LEN: usize = 2000;
const MAX_SELECTIONS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    InProgress,
    /// Handed to the exam service; no further answers are accepted.
    Submitting,
    Submitted,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::InProgress => "in_progress",
            SubmissionStatus::Submitting => "submitting",
            SubmissionStatus::Submitted => "submitted",
        }
    }
}

/// A learner's attempt at an exam.
///
/// Created when the exam starts, mutated one answer at a time, frozen while
/// the submit is in flight, sealed once the exam service accepted it.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub session_id: Uuid,
    pub submission_id: ExternalId,
    pub exam_id: ExternalId,
    pub learner_id: String,

    /// Raw answers keyed by question id: an index string, an array of index
    /// strings, or free text.
    pub answers: HashMap<ExternalId, Value>,

    pub status: SubmissionStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn new(submission_id: ExternalId, exam_id: ExternalId, learner_id: String) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            submission_id,
            exam_id,
            learner_id,
            answers: HashMap::new(),
            status: SubmissionStatus::InProgress,
            started_at: Utc::now(),
            submitted_at: None,
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.status == SubmissionStatus::Submitted
    }

    pub fn answer(&self, question_id: &ExternalId) -> Option<&Value> {
        self.answers.get(question_id)
    }

    /// Replaces the answer for one question. Fails once a submit has started.
    pub fn record_answer(
        &mut self,
        question_id: ExternalId,
        answer: Value,
    ) -> Result<(), AppError> {
        self.ensure_open()?;
        self.answers.insert(question_id, answer);
        Ok(())
    }

    /// Freezes the answers ahead of the upstream submit.
    pub fn begin_submit(&mut self) -> Result<(), AppError> {
        self.ensure_open()?;
        self.status = SubmissionStatus::Submitting;
        Ok(())
    }

    /// Reopens the submission after the upstream submit failed.
    pub fn abort_submit(&mut self) {
        if self.status == SubmissionStatus::Submitting {
            self.status = SubmissionStatus::InProgress;
        }
    }

    pub fn seal(&mut self) -> Result<(), AppError> {
        if self.is_sealed() {
            return Err(AppError::Conflict(
                "Submission has already been submitted".to_string(),
            ));
        }
        self.status = SubmissionStatus::Submitted;
        self.submitted_at = Some(Utc::now());
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), AppError> {
        match self.status {
            SubmissionStatus::InProgress => Ok(()),
            SubmissionStatus::Submitting => Err(AppError::Conflict(
                "Submission is being submitted".to_string(),
            )),
            SubmissionStatus::Submitted => Err(AppError::Conflict(
                "Submission has already been submitted".to_string(),
            )),
        }
    }
}

/// What the learner sees of a running (or finished) attempt.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub submission_id: ExternalId,
    pub exam_id: ExternalId,
    pub title: String,
    pub status: SubmissionStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub questions: Vec<PublicQuestion>,
    pub answers: HashMap<ExternalId, Value>,
}

impl SessionView {
    pub fn new(exam: &ExamDefinition, submission: &Submission) -> Self {
        Self {
            session_id: submission.session_id,
            submission_id: submission.submission_id.clone(),
            exam_id: exam.exam_id.clone(),
            title: exam.title.clone(),
            status: submission.status,
            started_at: submission.started_at,
            submitted_at: submission.submitted_at,
            questions: exam.questions.iter().map(PublicQuestion::from).collect(),
            answers: submission.answers.clone(),
        }
    }
}

/// DTO for saving a single answer.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    /// `null` clears the answer.
    #[serde(default)]
    #[validate(custom(function = validate_answer))]
    pub answer: Value,
}

fn validate_answer(answer: &Value) -> Result<(), ValidationError> {
    match answer {
        Value::Null => Ok(()),
        Value::String(text) if text.chars().count() > MAX_TEXT_ANSWER_LEN => {
            Err(ValidationError::new("answer_too_long"))
        }
        Value::String(_) => Ok(()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(()),
        Value::Array(items) => {
            if items.len() > MAX_SELECTIONS {
                return Err(ValidationError::new("too_many_selections"));
            }
            let all_indices = items.iter().all(|item| match item {
                Value::String(s) => s.len() <= 16,
                Value::Number(n) => n.is_i64() || n.is_u64(),
                _ => false,
            });
            if all_indices {
                Ok(())
            } else {
                Err(ValidationError::new("invalid_selection"))
            }
        }
        _ => Err(ValidationError::new("unsupported_answer_shape")),
    }
}
