// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use exam_interface::{
    config::Config,
    models::{exam::ExamDefinition, id::ExternalId, results::ResultsPayload},
    routes,
    services::exam_service::{ExamService, ServiceError},
    state::AppState,
    utils::jwt::Claims,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// In-memory stand-in for the exam service.
pub struct FakeExamService {
    pub exam: Value,
    /// `None` makes the results endpoint fail with 503.
    pub results: Mutex<Option<Value>>,
    pub submit_fails: Mutex<bool>,
    pub saved: Mutex<Vec<(String, Value)>>,
    pub submitted: Mutex<Vec<String>>,
}

impl FakeExamService {
    pub fn new(exam: Value) -> Arc<Self> {
        Arc::new(Self {
            exam,
            results: Mutex::new(None),
            submit_fails: Mutex::new(false),
            saved: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn set_results(&self, results: Value) {
        *self.results.lock().unwrap() = Some(results);
    }
}

#[async_trait]
impl ExamService for FakeExamService {
    async fn fetch_exam(
        &self,
        _token: &str,
        exam_id: &ExternalId,
    ) -> Result<ExamDefinition, ServiceError> {
        if self.exam["exam_id"].as_str() != Some(exam_id.as_str()) {
            return Err(ServiceError::Status {
                status: 404,
                body: "no such exam".to_string(),
            });
        }
        serde_json::from_value(self.exam.clone())
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn start_submission(
        &self,
        _token: &str,
        _exam_id: &ExternalId,
    ) -> Result<ExternalId, ServiceError> {
        Ok(ExternalId::from("sub-1"))
    }

    async fn save_answer(
        &self,
        _token: &str,
        _submission_id: &ExternalId,
        question_id: &ExternalId,
        answer: &Value,
    ) -> Result<(), ServiceError> {
        self.saved
            .lock()
            .unwrap()
            .push((question_id.to_string(), answer.clone()));
        Ok(())
    }

    async fn submit(&self, _token: &str, submission_id: &ExternalId) -> Result<(), ServiceError> {
        // Keeps the submit in flight long enough for concurrent requests to overlap
        tokio::time::sleep(Duration::from_millis(20)).await;
        if *self.submit_fails.lock().unwrap() {
            return Err(ServiceError::Transport("connection refused".to_string()));
        }
        self.submitted.lock().unwrap().push(submission_id.to_string());
        Ok(())
    }

    async fn fetch_results(
        &self,
        _token: &str,
        _submission_id: &ExternalId,
    ) -> Result<ResultsPayload, ServiceError> {
        match self.results.lock().unwrap().clone() {
            Some(results) => {
                serde_json::from_value(results).map_err(|e| ServiceError::Decode(e.to_string()))
            }
            None => Err(ServiceError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
        }
    }
}

pub fn sample_exam() -> Value {
    json!({
        "exam_id": "exam-1",
        "title": "World Capitals",
        "questions": [
            {
                "question_id": 1,
                "question_text": "Pick the European capitals",
                "type": "multiple_choice",
                "options": ["Paris", "Berlin", "Lima"],
                "correct_answer": ["Paris", "Berlin"],
                "points": 2
            },
            {
                "question_id": 2,
                "question_text": "Capital of France?",
                "type": "identification",
                "correct_answer": "{\"Paris\",\"paris \"}",
                "points": 3
            },
            {
                "question_id": 3,
                "question_text": "Capital of Peru?",
                "type": "multiple_choice",
                "options": ["Quito", "Lima"],
                "correct_answer": "Lima",
                "points": 5
            }
        ]
    })
}

pub fn token_for(learner_id: &str) -> String {
    let claims = Claims {
        sub: learner_id.to_string(),
        role: "student".to_string(),
        exp: 4_000_000_000,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

pub fn test_config() -> Config {
    Config {
        exam_service_url: "http://exam-service.invalid/".parse().unwrap(),
        exam_service_timeout_secs: 1,
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        legacy_substring_match: true,
        session_ttl_secs: 3600,
    }
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
pub async fn spawn_app(service: Arc<FakeExamService>) -> String {
    let state = AppState::new(test_config(), service);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}
