// src/models/report.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{assignment::AssignmentStatus, grade::FinalGrade};

/// One assignment's line in an exam report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub assignment_id: String,
    pub student_id: String,
    pub status: AssignmentStatus,
    pub average_score: Option<f64>,
    pub final_grade: Option<FinalGrade>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub submitted: usize,
    pub graded: usize,
}

/// Aggregated results of one exam across all its assignments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamReport {
    pub exam_id: String,
    pub total_assignments: usize,
    pub status_counts: StatusCounts,

    /// Mean of the final grades of graded assignments; `None` when nothing is graded.
    pub mean_final_grade: Option<f64>,

    /// Final grade (2..=5) to number of graded assignments with it.
    pub distribution: BTreeMap<u8, usize>,

    pub rows: Vec<ReportRow>,
}
