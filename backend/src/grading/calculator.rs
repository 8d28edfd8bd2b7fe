// src/grading/calculator.rs

use chrono::Utc;

use super::GradingError;
use crate::models::grade::{FinalGrade, Grade, QuestionScore, RoundingMethod};

/// Arithmetic mean of the given scores.
///
/// Ungraded answers must be filtered out by the caller; an empty slice has no
/// average and yields `GradingError::InvalidInput`.
pub fn compute_average(scores: &[QuestionScore]) -> Result<f64, GradingError> {
    if scores.is_empty() {
        return Err(GradingError::InvalidInput(
            "cannot average an empty list of scores".to_string(),
        ));
    }

    let sum: u32 = scores.iter().map(|s| u32::from(s.value())).sum();
    Ok(sum as f64 / scores.len() as f64)
}

/// Rounds an average with the given method and clamps the result into 2..=5.
///
/// * `Floor` goes toward negative infinity, `Ceil` toward positive infinity.
/// * `Round` picks the nearest integer; exact halves go up.
/// * NaN clamps to the bottom of the scale.
pub fn compute_final_grade(average: f64, rounding_method: RoundingMethod) -> FinalGrade {
    if average.is_nan() {
        return FinalGrade::clamped(i64::MIN);
    }

    let rounded = match rounding_method {
        RoundingMethod::Floor => average.floor(),
        RoundingMethod::Ceil => average.ceil(),
        RoundingMethod::Round => (average + 0.5).floor(),
    };

    // `as` saturates for infinities, which the clamp then absorbs.
    FinalGrade::clamped(rounded as i64)
}

/// Builds the grade to store for an assignment.
///
/// Creates a new grade with a fresh id when `existing` is `None`; otherwise
/// overwrites the computed fields and grading metadata while keeping the id.
/// Refuses a `final_grade` that is not derived from `average` by `rounding_method`.
pub fn upsert_grade(
    existing: Option<Grade>,
    assignment_id: &str,
    average: f64,
    final_grade: FinalGrade,
    rounding_method: RoundingMethod,
    graded_by: Option<String>,
) -> Result<Grade, GradingError> {
    if compute_final_grade(average, rounding_method) != final_grade {
        return Err(GradingError::InconsistentGrade {
            average,
            rounding_method,
            final_grade,
        });
    }

    let now = Utc::now();
    let grade = match existing {
        Some(mut grade) => {
            grade.average_score = average;
            grade.final_grade = final_grade;
            grade.rounding_method = rounding_method;
            grade.graded_at = now;
            grade.graded_by = graded_by;
            grade
        }
        None => Grade {
            id: uuid::Uuid::new_v4().to_string(),
            assignment_id: assignment_id.to_owned(),
            average_score: average,
            final_grade,
            rounding_method,
            graded_at: now,
            graded_by,
        },
    };

    Ok(grade)
}
