// src/grading/mod.rs

//! Grade computation and the assignment grading workflow.

pub mod calculator;
pub mod report;
pub mod workflow;

use std::fmt;

use crate::models::{
    assignment::AssignmentStatus,
    grade::{FinalGrade, RoundingMethod},
};

pub use calculator::{compute_average, compute_final_grade, upsert_grade};

/// Errors raised by the grading rules themselves, independent of storage.
#[derive(Debug, Clone, PartialEq)]
pub enum GradingError {
    /// Nothing to average, or a value outside the grading scale.
    InvalidInput(String),

    /// A final grade that does not follow from its average and rounding method.
    InconsistentGrade {
        average: f64,
        rounding_method: RoundingMethod,
        final_grade: FinalGrade,
    },

    /// An assignment status change that would move backwards.
    InvalidTransition {
        from: AssignmentStatus,
        to: AssignmentStatus,
    },

    /// Grading was requested before the student submitted.
    NotSubmitted(AssignmentStatus),
}

impl fmt::Display for GradingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            GradingError::InconsistentGrade {
                average,
                rounding_method,
                final_grade,
            } => write!(
                f,
                "Final grade {} does not follow from average {} with '{}' rounding",
                final_grade, average, rounding_method
            ),
            GradingError::InvalidTransition { from, to } => {
                write!(f, "Assignment cannot move from '{}' back to '{}'", from, to)
            }
            GradingError::NotSubmitted(status) => {
                write!(f, "Assignment is '{}' and has not been submitted yet", status)
            }
        }
    }
}

impl std::error::Error for GradingError {}
