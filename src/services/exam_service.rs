// src/services/exam_service.rs

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{exam::ExamDefinition, id::ExternalId, results::ResultsPayload};

/// Failure talking to the exam service.
#[derive(Debug)]
pub enum ServiceError {
    /// Connection refused, timeout, TLS, ...
    Transport(String),
    /// The service answered with a non-success status.
    Status { status: u16, body: String },
    /// The body could not be decoded.
    Decode(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Transport(msg) => write!(f, "transport error: {}", msg),
            ServiceError::Status { status, body } => {
                write!(f, "exam service returned {}: {}", status, body)
            }
            ServiceError::Decode(msg) => write!(f, "undecodable response: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

/// The exam backend, as seen from the test interface.
///
/// Every call carries the learner's bearer token explicitly.
#[async_trait]
pub trait ExamService: Send + Sync {
    /// Loads a published exam form, answer key included.
    async fn fetch_exam(
        &self,
        token: &str,
        exam_id: &ExternalId,
    ) -> Result<ExamDefinition, ServiceError>;

    /// Opens a new attempt and returns its submission id.
    async fn start_submission(
        &self,
        token: &str,
        exam_id: &ExternalId,
    ) -> Result<ExternalId, ServiceError>;

    async fn save_answer(
        &self,
        token: &str,
        submission_id: &ExternalId,
        question_id: &ExternalId,
        answer: &Value,
    ) -> Result<(), ServiceError>;

    async fn submit(&self, token: &str, submission_id: &ExternalId) -> Result<(), ServiceError>;

    async fn fetch_results(
        &self,
        token: &str,
        submission_id: &ExternalId,
    ) -> Result<ResultsPayload, ServiceError>;
}
