// src/services/http.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::{
    config::Config,
    models::{
        exam::{ExamDefinition, StartedSubmission},
        id::ExternalId,
        results::ResultsPayload,
    },
    services::exam_service::{ExamService, ServiceError},
};

/// `ExamService` over the exam backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpExamService {
    client: Client,
    base_url: Url,
}

impl HttpExamService {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        Self::new(
            config.exam_service_url.clone(),
            Duration::from_secs(config.exam_service_timeout_secs),
        )
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ServiceError::Transport(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ExamService for HttpExamService {
    async fn fetch_exam(
        &self,
        token: &str,
        exam_id: &ExternalId,
    ) -> Result<ExamDefinition, ServiceError> {
        let url = self.endpoint(&["exams", exam_id.as_str()])?;
        let response = self.send(self.client.get(url).bearer_auth(token)).await?;
        Self::decode(response).await
    }

    async fn start_submission(
        &self,
        token: &str,
        exam_id: &ExternalId,
    ) -> Result<ExternalId, ServiceError> {
        let url = self.endpoint(&["exams", exam_id.as_str(), "submissions"])?;
        let response = self.send(self.client.post(url).bearer_auth(token)).await?;
        let started: StartedSubmission = Self::decode(response).await?;
        Ok(started.submission_id)
    }

    async fn save_answer(
        &self,
        token: &str,
        submission_id: &ExternalId,
        question_id: &ExternalId,
        answer: &Value,
    ) -> Result<(), ServiceError> {
        let url = self.endpoint(&[
            "submissions",
            submission_id.as_str(),
            "answers",
            question_id.as_str(),
        ])?;
        self.send(
            self.client
                .put(url)
                .bearer_auth(token)
                .json(&json!({ "answer": answer })),
        )
        .await?;
        Ok(())
    }

    async fn submit(&self, token: &str, submission_id: &ExternalId) -> Result<(), ServiceError> {
        let url = self.endpoint(&["submissions", submission_id.as_str(), "submit"])?;
        self.send(self.client.post(url).bearer_auth(token)).await?;
        Ok(())
    }

    async fn fetch_results(
        &self,
        token: &str,
        submission_id: &ExternalId,
    ) -> Result<ResultsPayload, ServiceError> {
        let url = self.endpoint(&["submissions", submission_id.as_str(), "results"])?;
        let response = self.send(self.client.get(url).bearer_auth(token)).await?;
        Self::decode(response).await
    }
}
