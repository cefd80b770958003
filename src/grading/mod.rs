// src/grading/mod.rs

//! Grading reconciliation.
//!
//! Turns an exam definition, a sealed submission and (when reachable) the
//! exam service's results payload into per-question verdicts and a score.
//! Nothing in here fails: malformed input grades as incorrect.

pub mod correct_answer;
pub mod normalizer;
pub mod verdict;

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    config::Config,
    models::{
        exam::ExamDefinition,
        id::ExternalId,
        question::{ExamQuestion, QuestionType},
        results::{
            ExamSummary, GradedQuestion, GradingMode, PayloadQuestion, Results, ResultsPayload,
            SubmissionSummary,
        },
        submission::Submission,
    },
    services::exam_service::ExamService,
    utils::html::clean_html,
};

use correct_answer::CorrectAnswer;
use normalizer::normalize_answer;
use verdict::{GradingInput, LocalVerdict, grade_locally, merge, percentage_of, points_for};

/// Grading knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradingPolicy {
    /// Single-answer multiple choice with a plain-string key is correct when
    /// the key contains the picked option's text. Kept for compatibility
    /// with answer keys stored by the existing backend.
    pub legacy_substring_match: bool,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            legacy_substring_match: true,
        }
    }
}

impl From<&Config> for GradingPolicy {
    fn from(config: &Config) -> Self {
        Self {
            legacy_substring_match: config.legacy_substring_match,
        }
    }
}

/// Fetches the results payload through `service` and reconciles it; grades
/// locally when the fetch fails for any reason. Never retries.
pub async fn grade_submission(
    service: &dyn ExamService,
    token: &str,
    exam: &ExamDefinition,
    submission: &Submission,
    policy: &GradingPolicy,
) -> Results {
    match service.fetch_results(token, &submission.submission_id).await {
        Ok(payload) => reconcile(exam, submission, Some(&payload), policy),
        Err(e) => {
            tracing::warn!(
                "Results unavailable for submission {}, grading locally: {}",
                submission.submission_id,
                e
            );
            fallback_reconcile(exam, submission, policy)
        }
    }
}

pub fn reconcile(
    exam: &ExamDefinition,
    submission: &Submission,
    payload: Option<&ResultsPayload>,
    policy: &GradingPolicy,
) -> Results {
    match payload {
        Some(payload) => reconcile_authoritative(exam, submission, payload, policy),
        None => fallback_reconcile(exam, submission, policy),
    }
}

/// Grades every question from the locally held answers and answer keys.
/// The score is summed from scratch.
pub fn fallback_reconcile(
    exam: &ExamDefinition,
    submission: &Submission,
    policy: &GradingPolicy,
) -> Results {
    let questions: Vec<GradedQuestion> = exam
        .questions
        .iter()
        .map(|question| {
            let raw = submission.answer(&question.question_id).cloned().unwrap_or(Value::Null);
            let accepted = CorrectAnswer::parse(question.correct_answer.as_ref());
            let local = grade_one(
                question.question_type,
                &question.options,
                &raw,
                &accepted,
                policy,
                GradingMode::Fallback,
            );
            let is_correct = merge(None, local);

            GradedQuestion {
                question_id: question.question_id.clone(),
                question_text: clean_html(&question.question_text),
                question_type: question.question_type,
                options: question.options.clone(),
                correct_answer: accepted.accepted().to_vec(),
                student_answer: raw,
                is_correct,
                points: question.points,
                points_earned: points_for(is_correct, question.points),
            }
        })
        .collect();

    let score: f64 = questions.iter().map(|q| q.points_earned).sum();
    let total_points: f64 = questions.iter().map(|q| q.points).sum();

    Results {
        mode: GradingMode::Fallback,
        exam: ExamSummary {
            title: exam.title.clone(),
            exam_id: exam.exam_id.clone(),
        },
        submission: SubmissionSummary {
            submission_id: submission.submission_id.clone(),
            status: submission.status.as_str().to_string(),
            submitted_at: submission.submitted_at,
            score,
            total_points,
            percentage: percentage_of(score, total_points),
            has_requested_recheck: false,
        },
        questions,
    }
}

/// Trusts the payload and only patches what it leaves missing or ambiguous.
///
/// Upgrades are applied to the server's score as a delta so that any other
/// adjustment already in that score survives.
fn reconcile_authoritative(
    exam: &ExamDefinition,
    submission: &Submission,
    payload: &ResultsPayload,
    policy: &GradingPolicy,
) -> Results {
    let definitions: HashMap<&ExternalId, &ExamQuestion> =
        exam.questions.iter().map(|q| (&q.question_id, q)).collect();

    let mut delta = 0.0;
    let mut upgraded = 0usize;
    let mut server_sum = 0.0;

    let questions: Vec<GradedQuestion> = payload
        .questions
        .iter()
        .map(|question| {
            let definition = definitions.get(&question.question_id).copied();
            let server_earned = server_points_earned(question);
            server_sum += server_earned;

            let options = match (&question.options, definition) {
                (Some(options), _) if !options.is_empty() => options.clone(),
                (_, Some(def)) => def.options.clone(),
                _ => Vec::new(),
            };
            let question_type = match (question.question_type, definition) {
                (QuestionType::Unknown, Some(def)) => def.question_type,
                (known, _) => known,
            };
            let raw = if question.student_answer.is_null() {
                submission.answer(&question.question_id).cloned().unwrap_or(Value::Null)
            } else {
                question.student_answer.clone()
            };
            let accepted = CorrectAnswer::parse(question.correct_answer.as_ref()).or_else(|| {
                CorrectAnswer::parse(definition.and_then(|d| d.correct_answer.as_ref()))
            });

            let is_correct = if question.is_correct == Some(true) {
                true
            } else {
                let local = grade_one(
                    question_type,
                    &options,
                    &raw,
                    &accepted,
                    policy,
                    GradingMode::Authoritative,
                );
                merge(question.is_correct, local)
            };

            let points_earned = points_for(is_correct, question.points);
            if is_correct && question.is_correct != Some(true) {
                tracing::debug!("Upgraded question {} to correct", question.question_id);
                delta += points_earned - server_earned;
                upgraded += 1;
            }

            GradedQuestion {
                question_id: question.question_id.clone(),
                question_text: clean_html(&question.question_text),
                question_type,
                options,
                correct_answer: accepted.accepted().to_vec(),
                student_answer: raw,
                is_correct,
                points: question.points,
                points_earned,
            }
        })
        .collect();

    let server = &payload.submission;
    let score = server.score.unwrap_or(server_sum) + delta;
    let total_points = server
        .total_points
        .filter(|total| *total > 0.0)
        .unwrap_or_else(|| questions.iter().map(|q| q.points).sum());
    let percentage = match server.percentage {
        Some(pct) if upgraded == 0 && pct.is_finite() => pct.round().clamp(0.0, 100.0) as u32,
        _ => percentage_of(score, total_points),
    };

    if upgraded > 0 {
        tracing::info!(
            "Reconciled submission {}: {} question(s) upgraded, score {} -> {}",
            submission.submission_id,
            upgraded,
            score - delta,
            score
        );
    }

    let title = if payload.exam.title.is_empty() {
        exam.title.clone()
    } else {
        payload.exam.title.clone()
    };
    let exam_id = if payload.exam.exam_id.as_str().is_empty() {
        exam.exam_id.clone()
    } else {
        payload.exam.exam_id.clone()
    };
    let submission_id = if server.submission_id.as_str().is_empty() {
        submission.submission_id.clone()
    } else {
        server.submission_id.clone()
    };

    Results {
        mode: GradingMode::Authoritative,
        exam: ExamSummary { title, exam_id },
        submission: SubmissionSummary {
            submission_id,
            status: server
                .status
                .clone()
                .unwrap_or_else(|| submission.status.as_str().to_string()),
            submitted_at: server.submitted_at.or(submission.submitted_at),
            score,
            total_points,
            percentage,
            has_requested_recheck: server.has_requested_recheck,
        },
        questions,
    }
}

fn server_points_earned(question: &PayloadQuestion) -> f64 {
    question
        .points_earned
        .filter(|earned| earned.is_finite())
        .unwrap_or_else(|| points_for(question.is_correct == Some(true), question.points))
}

fn grade_one(
    question_type: QuestionType,
    options: &[String],
    raw: &Value,
    accepted: &CorrectAnswer,
    policy: &GradingPolicy,
    mode: GradingMode,
) -> LocalVerdict {
    let answer = normalize_answer(raw, question_type, options.len());
    let input = GradingInput {
        question_type,
        options,
        answer: &answer,
        accepted,
    };
    grade_locally(&input, policy, mode)
}
