// src/grading/report.rs

use std::collections::{BTreeMap, HashMap};

use crate::models::{
    assignment::{Assignment, AssignmentStatus},
    grade::{Grade, MAX_GRADE, MIN_GRADE},
    report::{ExamReport, ReportRow, StatusCounts},
};

/// Aggregates an exam's assignments and their grades.
///
/// Only assignments whose status is `graded` count toward the mean and the
/// distribution; a stale grade on any other status is shown in its row but
/// not aggregated.
pub fn build_exam_report(exam_id: &str, assignments: Vec<Assignment>, grades: Vec<Grade>) -> ExamReport {
    let mut grades_by_assignment: HashMap<String, Grade> = grades
        .into_iter()
        .map(|g| (g.assignment_id.clone(), g))
        .collect();

    let mut status_counts = StatusCounts::default();
    let mut distribution: BTreeMap<u8, usize> = (MIN_GRADE..=MAX_GRADE).map(|g| (g, 0)).collect();
    let mut graded_sum = 0u32;
    let mut graded_count = 0usize;

    let mut rows = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        match assignment.status {
            AssignmentStatus::Pending => status_counts.pending += 1,
            AssignmentStatus::InProgress => status_counts.in_progress += 1,
            AssignmentStatus::Submitted => status_counts.submitted += 1,
            AssignmentStatus::Graded => status_counts.graded += 1,
        }

        let grade = grades_by_assignment.remove(&assignment.id);
        if let (AssignmentStatus::Graded, Some(g)) = (assignment.status, &grade) {
            *distribution.entry(g.final_grade.value()).or_default() += 1;
            graded_sum += u32::from(g.final_grade.value());
            graded_count += 1;
        }

        rows.push(ReportRow {
            assignment_id: assignment.id,
            student_id: assignment.student_id,
            status: assignment.status,
            average_score: grade.as_ref().map(|g| g.average_score),
            final_grade: grade.as_ref().map(|g| g.final_grade),
        });
    }

    rows.sort_by(|a, b| a.student_id.cmp(&b.student_id));

    let mean_final_grade = (graded_count > 0).then(|| graded_sum as f64 / graded_count as f64);

    ExamReport {
        exam_id: exam_id.to_owned(),
        total_assignments: rows.len(),
        status_counts,
        mean_final_grade,
        distribution,
        rows,
    }
}
