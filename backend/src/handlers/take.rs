// src/handlers/take.rs

//! Exam-taking routes, authorized by the magic link token in the path
//! instead of a login.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        answer::{SaveAnswerRequest, StudentAnswer},
        assignment::{Assignment, AssignmentStatus},
        grade::Grade,
        monitoring::{MonitoringEvent, RecordEventRequest},
    },
    store::Store,
    utils::jwt::verify_magic_token,
};

/// What the student sees. Scores, feedback and the grade stay hidden until graded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeView {
    pub assignment: Assignment,
    pub answers: Vec<StudentAnswer>,
    pub grade: Option<Grade>,
}

async fn assignment_for_token(
    store: &Store,
    config: &Config,
    token: &str,
) -> Result<Assignment, AppError> {
    let assignment_id = verify_magic_token(token, &config.jwt_secret)?;

    store
        .assignments
        .find(&assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("This exam link is no longer valid".to_string()))
}

fn require_in_progress(assignment: &Assignment) -> Result<(), AppError> {
    if assignment.status != AssignmentStatus::InProgress {
        return Err(AppError::Conflict(format!(
            "Exam is '{}', not in progress",
            assignment.status
        )));
    }
    Ok(())
}

pub async fn view(
    State(store): State<Store>,
    State(config): State<Config>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = assignment_for_token(&store, &config, &token).await?;
    let graded = assignment.status == AssignmentStatus::Graded;

    let mut answers = store.answers.list_for_assignment(&assignment.id).await?;
    if !graded {
        for answer in &mut answers {
            answer.score = None;
            answer.feedback = None;
        }
    }

    let grade = if graded {
        store.grades.find(&assignment.id).await?
    } else {
        None
    };

    Ok(Json(TakeView {
        assignment,
        answers,
        grade,
    }))
}

/// Opens the exam. Starting an exam that is already running is a no-op.
pub async fn start(
    State(store): State<Store>,
    State(config): State<Config>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = assignment_for_token(&store, &config, &token).await?;

    if assignment.status > AssignmentStatus::InProgress {
        return Err(AppError::Conflict("Exam has already been submitted".to_string()));
    }

    let assignment = store
        .assignments
        .advance_status(&assignment.id, AssignmentStatus::InProgress)
        .await?;

    tracing::info!(assignment_id = %assignment.id, "Exam started");

    Ok(Json(assignment))
}

/// Saves (or replaces) the student's answer to one question.
pub async fn save_answer(
    State(store): State<Store>,
    State(config): State<Config>,
    Path((token, question_id)): Path<(String, String)>,
    payload: Result<Json<SaveAnswerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if question_id.is_empty() || question_id.len() > 100 {
        return Err(AppError::BadRequest("Invalid question id".to_string()));
    }

    let assignment = assignment_for_token(&store, &config, &token).await?;
    require_in_progress(&assignment)?;

    let mut answer = store
        .answers
        .find(&assignment.id, &question_id)
        .await?
        .unwrap_or_else(|| StudentAnswer::blank(&assignment.id, &question_id));

    answer.answer = Some(req.answer);
    answer.updated_at = Utc::now();
    store.answers.upsert(&answer).await?;

    Ok(Json(answer))
}

/// Hands the exam in. Submitting twice is a no-op; submitting an exam that
/// was never started is refused.
pub async fn submit(
    State(store): State<Store>,
    State(config): State<Config>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = assignment_for_token(&store, &config, &token).await?;

    match assignment.status {
        AssignmentStatus::Pending => {
            return Err(AppError::Conflict("Exam has not been started".to_string()));
        }
        AssignmentStatus::Submitted | AssignmentStatus::Graded => {
            return Ok(Json(assignment));
        }
        AssignmentStatus::InProgress => {}
    }

    let assignment = store
        .assignments
        .advance_status(&assignment.id, AssignmentStatus::Submitted)
        .await?;

    tracing::info!(assignment_id = %assignment.id, "Exam submitted");

    Ok(Json(assignment))
}

/// Records a proctoring event reported by the exam client.
pub async fn record_event(
    State(store): State<Store>,
    State(config): State<Config>,
    Path(token): Path<String>,
    payload: Result<Json<RecordEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let assignment = assignment_for_token(&store, &config, &token).await?;
    require_in_progress(&assignment)?;

    let event = MonitoringEvent {
        id: uuid::Uuid::new_v4().to_string(),
        assignment_id: assignment.id,
        kind: req.kind,
        detail: req.detail,
        occurred_at: req.occurred_at.unwrap_or_else(Utc::now),
    };
    store.events.record(&event).await?;

    tracing::debug!(assignment_id = %event.assignment_id, kind = event.kind.as_str(), "Monitoring event");

    Ok((StatusCode::CREATED, Json(event)))
}
