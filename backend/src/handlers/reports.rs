// src/handlers/reports.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, grading::report::build_exam_report, store::Store};

/// Results of one exam: per-student rows, status counts and the grade distribution.
pub async fn exam_report(
    State(store): State<Store>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assignments = store.assignments.list_for_exam(&exam_id).await?;
    let grades = store.grades.list_for_exam(&exam_id).await?;

    Ok(Json(build_exam_report(&exam_id, assignments, grades)))
}
