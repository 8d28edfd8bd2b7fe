// src/grading/workflow.rs

use super::{GradingError, compute_average, compute_final_grade, upsert_grade};
use crate::{
    error::AppError,
    models::{
        assignment::AssignmentStatus,
        grade::{Grade, QuestionScore, RoundingMethod},
    },
    store::Store,
};

/// Grades an assignment from an explicit list of scores.
///
/// * The assignment must exist and be `submitted` (or already `graded`, which re-grades it).
/// * The grade is created on first call and overwritten in place afterwards.
/// * The assignment is advanced to `graded` once the grade is stored.
pub async fn grade_scores(
    store: &Store,
    assignment_id: &str,
    scores: &[QuestionScore],
    rounding_method: RoundingMethod,
    graded_by: Option<String>,
) -> Result<Grade, AppError> {
    let assignment = store
        .assignments
        .find(assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assignment '{}' not found", assignment_id)))?;

    if !assignment.status.is_gradable() {
        return Err(GradingError::NotSubmitted(assignment.status).into());
    }

    let average = compute_average(scores)?;
    let final_grade = compute_final_grade(average, rounding_method);

    let existing = store.grades.find(assignment_id).await?;
    let regrade = existing.is_some();
    let grade = upsert_grade(
        existing,
        assignment_id,
        average,
        final_grade,
        rounding_method,
        graded_by,
    )?;

    let grade = store.grades.upsert(&grade).await?;
    store
        .assignments
        .advance_status(assignment_id, AssignmentStatus::Graded)
        .await?;

    tracing::info!(
        assignment_id,
        average,
        final_grade = final_grade.value(),
        %rounding_method,
        regrade,
        "Assignment graded"
    );

    Ok(grade)
}

/// Grades an assignment from the scores already stored on its answers.
/// Ungraded answers are left out; an assignment without any scored answer is rejected.
pub async fn finalize_assignment(
    store: &Store,
    assignment_id: &str,
    rounding_method: RoundingMethod,
    graded_by: Option<String>,
) -> Result<Grade, AppError> {
    let scores: Vec<QuestionScore> = store
        .answers
        .list_for_assignment(assignment_id)
        .await?
        .into_iter()
        .filter_map(|a| a.score)
        .collect();

    grade_scores(store, assignment_id, &scores, rounding_method, graded_by).await
}
