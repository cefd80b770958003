// src/services/session_store.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{exam::ExamDefinition, id::ExternalId, submission::Submission},
};

/// One learner's attempt at one exam.
#[derive(Debug, Clone)]
pub struct ExamSession {
    pub exam: ExamDefinition,
    pub submission: Submission,
    /// Last time the session was created or changed.
    pub last_active: DateTime<Utc>,
}

impl ExamSession {
    pub fn new(exam: ExamDefinition, submission: Submission) -> Self {
        Self {
            exam,
            submission,
            last_active: Utc::now(),
        }
    }
}

/// In-memory sessions, keyed by session id.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, ExamSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: ExamSession) -> Uuid {
        let id = session.submission.session_id;
        self.inner.write().await.insert(id, session);
        id
    }

    /// Snapshot of a session owned by `learner_id`.
    pub async fn get(&self, session_id: Uuid, learner_id: &str) -> Result<ExamSession, AppError> {
        let sessions = self.inner.read().await;
        let session = owned(sessions.get(&session_id), learner_id)?;
        Ok(session.clone())
    }

    /// Runs `f` on a session owned by `learner_id` under the write lock.
    pub async fn update<T>(
        &self,
        session_id: Uuid,
        learner_id: &str,
        f: impl FnOnce(&mut ExamSession) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut sessions = self.inner.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if session.submission.learner_id != learner_id {
            return Err(AppError::Forbidden(
                "Session belongs to another learner".to_string(),
            ));
        }
        session.last_active = Utc::now();
        f(session)
    }

    /// Ends a session owned by `learner_id` and hands it back.
    pub async fn remove(
        &self,
        session_id: Uuid,
        learner_id: &str,
    ) -> Result<ExamSession, AppError> {
        let mut sessions = self.inner.write().await;
        owned(sessions.get(&session_id), learner_id)?;
        sessions
            .remove(&session_id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    /// Drops every session idle for at least `max_idle` and returns the
    /// submission ids they held.
    pub async fn evict_idle(&self, max_idle: Duration) -> Vec<ExternalId> {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_idle) else {
            return Vec::new();
        };
        let mut evicted = Vec::new();
        self.inner.write().await.retain(|_, session| {
            let keep = session.last_active > cutoff;
            if !keep {
                evicted.push(session.submission.submission_id.clone());
            }
            keep
        });
        evicted
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }
}

fn owned<'a>(
    session: Option<&'a ExamSession>,
    learner_id: &str,
) -> Result<&'a ExamSession, AppError> {
    let session = session.ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
    if session.submission.learner_id != learner_id {
        return Err(AppError::Forbidden(
            "Session belongs to another learner".to_string(),
        ));
    }
    Ok(session)
}
