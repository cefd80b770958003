// src/models/exam.rs

use serde::{Deserialize, Serialize};

use crate::models::{id::ExternalId, question::ExamQuestion};

/// A published exam form as served by the exam service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDefinition {
    pub exam_id: ExternalId,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub questions: Vec<ExamQuestion>,
}

impl ExamDefinition {
    pub fn question(&self, question_id: &ExternalId) -> Option<&ExamQuestion> {
        self.questions.iter().find(|q| &q.question_id == question_id)
    }
}

/// Response of the exam service when a new attempt is opened.
#[derive(Debug, Clone, Deserialize)]
pub struct StartedSubmission {
    pub submission_id: ExternalId,
}
