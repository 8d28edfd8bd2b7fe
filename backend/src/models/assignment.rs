// src/models/assignment.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::grading::GradingError;

/// Lifecycle of a single student's exam instance. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    InProgress,
    Submitted,
    Graded,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Submitted => "submitted",
            AssignmentStatus::Graded => "graded",
        }
    }

    /// Returns `next` if moving there is not a regression.
    /// Re-entering the current status is allowed and changes nothing.
    pub fn advance(self, next: AssignmentStatus) -> Result<AssignmentStatus, GradingError> {
        if next < self {
            return Err(GradingError::InvalidTransition { from: self, to: next });
        }
        Ok(next)
    }

    /// Whether a teacher may (re-)grade an assignment in this status.
    pub fn is_gradable(self) -> bool {
        matches!(self, AssignmentStatus::Submitted | AssignmentStatus::Graded)
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = GradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AssignmentStatus::Pending),
            "in_progress" => Ok(AssignmentStatus::InProgress),
            "submitted" => Ok(AssignmentStatus::Submitted),
            "graded" => Ok(AssignmentStatus::Graded),
            other => Err(GradingError::InvalidInput(format!(
                "unknown assignment status '{}'",
                other
            ))),
        }
    }
}

/// Represents the 'assignments' table in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn new(exam_id: &str, student_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            exam_id: exam_id.to_owned(),
            student_id: student_id.to_owned(),
            status: AssignmentStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            submitted_at: None,
        }
    }

    /// Moves the assignment forward, stamping the start/submit time the first
    /// time the corresponding status is reached.
    pub fn transition(&mut self, next: AssignmentStatus) -> Result<(), GradingError> {
        self.status = self.status.advance(next)?;

        let now = Utc::now();
        if self.status >= AssignmentStatus::InProgress && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if self.status >= AssignmentStatus::Submitted && self.submitted_at.is_none() {
            self.submitted_at = Some(now);
        }
        Ok(())
    }
}

/// DTO for assigning an exam to a student.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    #[validate(length(min = 1, max = 100))]
    pub exam_id: String,
    #[validate(length(min = 1, max = 100))]
    pub student_id: String,
}

/// Returned once, when the assignment is created. The token is the student's magic link.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAssignmentResponse {
    pub assignment: Assignment,
    pub token: String,
    pub expires_in: u64,
}
