// src/models/grade.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::grading::GradingError;

/// Lowest value on the ordinal grading scale.
pub const MIN_GRADE: u8 = 2;
/// Highest value on the ordinal grading scale.
pub const MAX_GRADE: u8 = 5;

/// One answer's evaluation on the 2..=5 scale.
///
/// Only constructible through `TryFrom`, so a score outside the scale is
/// rejected while the request body is still being deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct QuestionScore(u8);

impl QuestionScore {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for QuestionScore {
    type Error = GradingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (MIN_GRADE as i64..=MAX_GRADE as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(GradingError::InvalidInput(format!(
                "score {} is outside {}..={}",
                value, MIN_GRADE, MAX_GRADE
            )))
        }
    }
}

impl From<QuestionScore> for u8 {
    fn from(score: QuestionScore) -> Self {
        score.0
    }
}

/// The single rounded grade of an assignment, always within 2..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct FinalGrade(u8);

impl FinalGrade {
    /// Builds a grade from any integer, saturating at the ends of the scale.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(MIN_GRADE as i64, MAX_GRADE as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for FinalGrade {
    type Error = GradingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (MIN_GRADE as i64..=MAX_GRADE as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(GradingError::InvalidInput(format!(
                "final grade {} is outside {}..={}",
                value, MIN_GRADE, MAX_GRADE
            )))
        }
    }
}

impl From<FinalGrade> for u8 {
    fn from(grade: FinalGrade) -> Self {
        grade.0
    }
}

impl fmt::Display for FinalGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an average is turned into a final grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMethod {
    Floor,
    Ceil,
    /// Nearest integer, ties go up.
    Round,
}

impl RoundingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundingMethod::Floor => "floor",
            RoundingMethod::Ceil => "ceil",
            RoundingMethod::Round => "round",
        }
    }
}

impl fmt::Display for RoundingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundingMethod {
    type Err = GradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "floor" => Ok(RoundingMethod::Floor),
            "ceil" => Ok(RoundingMethod::Ceil),
            "round" => Ok(RoundingMethod::Round),
            other => Err(GradingError::InvalidInput(format!(
                "unknown rounding method '{}'",
                other
            ))),
        }
    }
}

/// Represents the 'grades' table. One row per assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub assignment_id: String,

    /// Mean of the per-question scores the grade was computed from.
    pub average_score: f64,

    /// Always equals `compute_final_grade(average_score, rounding_method)`.
    pub final_grade: FinalGrade,

    pub rounding_method: RoundingMethod,
    pub graded_at: DateTime<Utc>,
    pub graded_by: Option<String>,
}

/// DTO for grading an assignment from an explicit list of scores.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    #[validate(length(min = 1, max = 100))]
    pub assignment_id: String,

    /// Scores of the graded answers only. May be empty, which the calculator rejects.
    pub scores: Vec<QuestionScore>,

    pub rounding_method: RoundingMethod,

    /// Defaults to the authenticated teacher when omitted.
    #[validate(length(min = 1, max = 100))]
    pub graded_by: Option<String>,
}

/// DTO for a dry-run of the calculator.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub scores: Vec<QuestionScore>,
    pub rounding_method: RoundingMethod,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub average_score: f64,
    pub final_grade: FinalGrade,
    pub rounding_method: RoundingMethod,
}

/// DTO for finalizing an assignment from its stored answer scores.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub rounding_method: Option<RoundingMethod>,

    #[validate(length(min = 1, max = 100))]
    pub graded_by: Option<String>,
}
