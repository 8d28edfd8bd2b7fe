// src/models/answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::grade::QuestionScore;

/// What a student put down for one question. At most one kind per answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    /// Reference to one of the question's options.
    #[serde(rename = "option")]
    SelectedOption(String),
    Text(String),
    Numeric(f64),
}

/// Represents the 'student_answers' table, keyed by (assignment, question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswer {
    pub assignment_id: String,
    pub question_id: String,

    /// `None` when the teacher scored a question the student left blank.
    pub answer: Option<AnswerValue>,

    /// `None` until graded.
    pub score: Option<QuestionScore>,

    /// Sanitized HTML.
    pub feedback: Option<String>,

    pub updated_at: DateTime<Utc>,
}

impl StudentAnswer {
    pub fn blank(assignment_id: &str, question_id: &str) -> Self {
        Self {
            assignment_id: assignment_id.to_owned(),
            question_id: question_id.to_owned(),
            answer: None,
            score: None,
            feedback: None,
            updated_at: Utc::now(),
        }
    }
}

/// DTO for a student saving an answer.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    #[validate(custom(function = validate_answer))]
    pub answer: AnswerValue,
}

/// DTO for a teacher scoring one answer. A `null` score clears it.
#[derive(Debug, Deserialize, Validate)]
pub struct ScoreAnswerRequest {
    pub score: Option<QuestionScore>,
    #[validate(length(max = 2000))]
    pub feedback: Option<String>,
}

fn validate_answer(answer: &AnswerValue) -> Result<(), validator::ValidationError> {
    match answer {
        AnswerValue::SelectedOption(option) if option.is_empty() || option.len() > 100 => {
            Err(validator::ValidationError::new("invalid_option_reference"))
        }
        AnswerValue::Text(text) if text.len() > 20_000 => {
            Err(validator::ValidationError::new("answer_too_long"))
        }
        AnswerValue::Numeric(n) if !n.is_finite() => {
            Err(validator::ValidationError::new("answer_not_finite"))
        }
        _ => Ok(()),
    }
}
