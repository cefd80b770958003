use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    grading::GradingPolicy,
    services::{answer_writer::AnswerWriter, exam_service::ExamService, session_store::SessionStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub policy: GradingPolicy,
    pub exam_service: Arc<dyn ExamService>,
    pub writer: Arc<AnswerWriter>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, exam_service: Arc<dyn ExamService>) -> Self {
        Self {
            policy: GradingPolicy::from(&config),
            writer: Arc::new(AnswerWriter::new(exam_service.clone())),
            sessions: SessionStore::new(),
            exam_service,
            config,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
