// src/handlers/assignments.rs

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::{Config, DEFAULT_ROUNDING_METHOD},
    error::AppError,
    grading::{GradingError, workflow},
    models::{
        answer::{ScoreAnswerRequest, StudentAnswer},
        assignment::{
            Assignment, AssignmentStatus, CreateAssignmentRequest, CreatedAssignmentResponse,
        },
        grade::FinalizeRequest,
    },
    store::Store,
    utils::{html::clean_feedback, jwt::{Claims, sign_magic_token}},
};

async fn load_assignment(store: &Store, id: &str) -> Result<Assignment, AppError> {
    store
        .assignments
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assignment '{}' not found", id)))
}

/// Assigns an exam to a student.
///
/// Creates a `pending` assignment and returns it together with the magic link
/// token the student uses to take the exam. The token is not stored.
pub async fn create_assignment(
    State(store): State<Store>,
    State(config): State<Config>,
    payload: Result<Json<CreateAssignmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let assignment = Assignment::new(&req.exam_id, &req.student_id);
    store.assignments.upsert(&assignment).await?;

    let token = sign_magic_token(&assignment.id, &config.jwt_secret, config.magic_token_ttl)?;

    tracing::info!(
        assignment_id = %assignment.id,
        exam_id = %assignment.exam_id,
        student_id = %assignment.student_id,
        "Assignment created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedAssignmentResponse {
            assignment,
            token,
            expires_in: config.magic_token_ttl,
        }),
    ))
}

pub async fn get_assignment(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_assignment(&store, &id).await?))
}

/// Removes an assignment with everything recorded against it.
pub async fn delete_assignment(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    load_assignment(&store, &id).await?;

    store.grades.delete(&id).await?;
    let answers = store.answers.delete_for_assignment(&id).await?;
    let events = store.events.delete_for_assignment(&id).await?;
    store.assignments.delete(&id).await?;

    tracing::info!(assignment_id = %id, answers, events, "Assignment deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the answers of an assignment, scores and feedback included.
pub async fn list_answers(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    load_assignment(&store, &id).await?;
    let answers = store.answers.list_for_assignment(&id).await?;
    Ok(Json(answers))
}

/// Sets (or clears, with a null score) one answer's score and feedback.
///
/// Only allowed between submission and grading: a graded assignment's answers
/// are frozen, re-grading goes through `POST /api/grades`. Scoring a question
/// the student left blank records a blank answer with that score.
pub async fn score_answer(
    State(store): State<Store>,
    Path((id, question_id)): Path<(String, String)>,
    payload: Result<Json<ScoreAnswerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let assignment = load_assignment(&store, &id).await?;
    match assignment.status {
        AssignmentStatus::Submitted => {}
        AssignmentStatus::Graded => {
            return Err(AppError::Conflict(
                "Assignment is already graded; its answers can no longer be scored".to_string(),
            ));
        }
        status => return Err(GradingError::NotSubmitted(status).into()),
    }

    let mut answer = store
        .answers
        .find(&id, &question_id)
        .await?
        .unwrap_or_else(|| StudentAnswer::blank(&id, &question_id));

    answer.score = req.score;
    answer.feedback = clean_feedback(req.feedback.as_deref());
    answer.updated_at = Utc::now();

    store.answers.upsert(&answer).await?;

    Ok(Json(answer))
}

/// Grades an assignment from the scores stored on its answers.
///
/// Rounding defaults to `round`; `gradedBy` defaults to the authenticated teacher.
pub async fn finalize(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // An empty body means all defaults, whatever the content type.
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        FinalizeRequest::default()
    } else {
        serde_json::from_slice::<FinalizeRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let rounding_method = req.rounding_method.unwrap_or(DEFAULT_ROUNDING_METHOD);
    let graded_by = req.graded_by.or(Some(claims.sub));

    let grade = workflow::finalize_assignment(&store, &id, rounding_method, graded_by).await?;

    Ok(Json(grade))
}

/// Lists the proctoring events of an assignment, oldest first.
pub async fn list_events(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    load_assignment(&store, &id).await?;
    let events = store.events.list_for_assignment(&id).await?;
    Ok(Json(events))
}
