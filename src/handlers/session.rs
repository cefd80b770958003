// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    grading::grade_submission,
    models::{
        id::ExternalId,
        submission::{SaveAnswerRequest, SessionView, Submission},
    },
    services::session_store::ExamSession,
    state::AppState,
    utils::jwt::{BearerToken, Claims},
};

/// Starts an exam attempt.
///
/// * Loads the exam form (answer key included) from the exam service.
/// * Opens a submission upstream.
/// * Keeps both in a new session and returns the learner's view of it.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam_id = ExternalId::from(exam_id);

    let exam = state.exam_service.fetch_exam(&token, &exam_id).await?;
    let submission_id = state.exam_service.start_submission(&token, &exam_id).await?;

    let learner_id = claims.sub;
    let submission = Submission::new(submission_id, exam.exam_id.clone(), learner_id.clone());
    let view = SessionView::new(&exam, &submission);
    let session_id = state.sessions.insert(ExamSession::new(exam, submission)).await;

    tracing::info!(
        "Learner {} started exam {} (session {})",
        learner_id,
        exam_id,
        session_id
    );

    Ok((StatusCode::CREATED, Json(view)))
}

/// Returns the session without answer keys.
pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(session_id, &claims.sub).await?;
    Ok(Json(SessionView::new(&session.exam, &session.submission)))
}

/// Records one answer and queues its write to the exam service.
///
/// Both happen under the session's write lock, so concurrent saves for one
/// question reach the exam service in the order they were recorded.
pub async fn save_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    Path((session_id, question_id)): Path<(Uuid, String)>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question_id = ExternalId::from(question_id);
    let answer = payload.answer;

    let writer = state.writer.clone();
    state
        .sessions
        .update(session_id, &claims.sub, |session| {
            if session.exam.question(&question_id).is_none() {
                return Err(AppError::NotFound(format!(
                    "Question {} is not part of this exam",
                    question_id
                )));
            }
            session
                .submission
                .record_answer(question_id.clone(), answer.clone())?;
            writer.enqueue(
                token,
                session.submission.submission_id.clone(),
                question_id,
                answer,
            );
            Ok(())
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Submits the attempt and returns its graded results.
///
/// * Freezes the answers, then waits for queued writes and submits upstream.
/// * Seals the local submission only once the exam service accepted it;
///   reopens it if the submit failed.
/// * Grades against the results payload, or locally if it cannot be fetched.
pub async fn submit_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let submission_id = state
        .sessions
        .update(session_id, &claims.sub, |session| {
            session.submission.begin_submit()?;
            Ok(session.submission.submission_id.clone())
        })
        .await?;

    state.writer.flush(&submission_id).await;
    if let Err(e) = state.exam_service.submit(&token, &submission_id).await {
        tracing::warn!("Submit of {} failed, reopening: {}", submission_id, e);
        state
            .sessions
            .update(session_id, &claims.sub, |session| {
                session.submission.abort_submit();
                Ok(())
            })
            .await?;
        return Err(e.into());
    }

    let session = state
        .sessions
        .update(session_id, &claims.sub, |session| {
            session.submission.seal()?;
            Ok(session.clone())
        })
        .await?;
    state.writer.close(&submission_id);

    tracing::info!("Submission {} sealed", submission_id);

    let results = grade_submission(
        state.exam_service.as_ref(),
        &token,
        &session.exam,
        &session.submission,
        &state.policy,
    )
    .await;

    Ok(Json(results))
}

/// Grades a submitted attempt again from a fresh results fetch.
pub async fn get_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(session_id, &claims.sub).await?;
    if !session.submission.is_sealed() {
        return Err(AppError::Conflict(
            "Submission has not been submitted yet".to_string(),
        ));
    }

    let results = grade_submission(
        state.exam_service.as_ref(),
        &token,
        &session.exam,
        &session.submission,
        &state.policy,
    )
    .await;

    Ok(Json(results))
}

/// Ends the session and forgets it.
pub async fn end_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.remove(session_id, &claims.sub).await?;
    state.writer.close(&session.submission.submission_id);

    tracing::info!("Session {} ended", session_id);

    Ok(StatusCode::NO_CONTENT)
}
