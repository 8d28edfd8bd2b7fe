// src/handlers/grades.rs

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    grading::{compute_average, compute_final_grade, workflow},
    models::grade::{GradeRequest, PreviewRequest, PreviewResponse},
    store::Store,
    utils::jwt::Claims,
};

/// Runs the calculator without storing anything.
///
/// Lets the grading screen show what a set of scores would produce under each rounding method.
pub async fn preview_grade(
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let average_score = compute_average(&req.scores)?;
    let final_grade = compute_final_grade(average_score, req.rounding_method);

    Ok(Json(PreviewResponse {
        average_score,
        final_grade,
        rounding_method: req.rounding_method,
    }))
}

/// Grades an assignment from the submitted scores and stores the result.
///
/// * Creates the grade on first call, overwrites it (same id) on re-grading.
/// * `gradedBy` defaults to the authenticated teacher.
/// * Returns 201 on creation and 200 on re-grading.
pub async fn create_grade(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<GradeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existed = store.grades.find(&req.assignment_id).await?.is_some();
    let graded_by = req.graded_by.or(Some(claims.sub));

    let grade = workflow::grade_scores(
        &store,
        &req.assignment_id,
        &req.scores,
        req.rounding_method,
        graded_by,
    )
    .await?;

    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(grade)))
}

/// Returns the stored grade of an assignment.
pub async fn get_grade(
    State(store): State<Store>,
    Path(assignment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let grade = store
        .grades
        .find(&assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No grade for assignment '{}'", assignment_id)))?;

    Ok(Json(grade))
}
