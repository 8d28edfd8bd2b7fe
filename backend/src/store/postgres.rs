// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use super::{AnswerRepository, AssignmentRepository, GradeRepository, MonitoringRepository};
use crate::{
    error::AppError,
    models::{
        answer::{AnswerValue, StudentAnswer},
        assignment::Assignment,
        grade::{FinalGrade, Grade, QuestionScore},
        monitoring::{MonitoringEvent, MonitoringEventKind},
    },
};

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Rows carry database-native types; conversion into the domain types
/// rejects anything the schema constraints should have prevented.
fn corrupt(what: &str, err: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(format!("Corrupt {} row: {}", what, err))
}

#[derive(FromRow)]
struct GradeRow {
    id: String,
    assignment_id: String,
    average_score: f64,
    final_grade: i16,
    rounding_method: String,
    graded_at: DateTime<Utc>,
    graded_by: Option<String>,
}

impl TryFrom<GradeRow> for Grade {
    type Error = AppError;

    fn try_from(row: GradeRow) -> Result<Self, Self::Error> {
        Ok(Grade {
            id: row.id,
            assignment_id: row.assignment_id,
            average_score: row.average_score,
            final_grade: FinalGrade::try_from(i64::from(row.final_grade))
                .map_err(|e| corrupt("grade", e))?,
            rounding_method: row.rounding_method.parse().map_err(|e| corrupt("grade", e))?,
            graded_at: row.graded_at,
            graded_by: row.graded_by,
        })
    }
}

#[derive(FromRow)]
struct AssignmentRow {
    id: String,
    exam_id: String,
    student_id: String,
    status: String,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = AppError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(Assignment {
            id: row.id,
            exam_id: row.exam_id,
            student_id: row.student_id,
            status: row.status.parse().map_err(|e| corrupt("assignment", e))?,
            created_at: row.created_at,
            started_at: row.started_at,
            submitted_at: row.submitted_at,
        })
    }
}

#[derive(FromRow)]
struct AnswerRow {
    assignment_id: String,
    question_id: String,
    answer: Option<Json<AnswerValue>>,
    score: Option<i16>,
    feedback: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AnswerRow> for StudentAnswer {
    type Error = AppError;

    fn try_from(row: AnswerRow) -> Result<Self, Self::Error> {
        let score = row
            .score
            .map(|s| QuestionScore::try_from(i64::from(s)))
            .transpose()
            .map_err(|e| corrupt("answer", e))?;

        Ok(StudentAnswer {
            assignment_id: row.assignment_id,
            question_id: row.question_id,
            answer: row.answer.map(|Json(v)| v),
            score,
            feedback: row.feedback,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct EventRow {
    id: String,
    assignment_id: String,
    kind: String,
    detail: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for MonitoringEvent {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let kind = MonitoringEventKind::parse(&row.kind)
            .ok_or_else(|| corrupt("monitoring event", format!("unknown kind '{}'", row.kind)))?;

        Ok(MonitoringEvent {
            id: row.id,
            assignment_id: row.assignment_id,
            kind,
            detail: row.detail,
            occurred_at: row.occurred_at,
        })
    }
}

#[async_trait]
impl GradeRepository for PgStore {
    async fn find(&self, assignment_id: &str) -> Result<Option<Grade>, AppError> {
        let row = sqlx::query_as::<_, GradeRow>(
            r#"
            SELECT id, assignment_id, average_score, final_grade, rounding_method, graded_at, graded_by
            FROM grades
            WHERE assignment_id = $1
            "#,
        )
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch grade: {:?}", e);
            AppError::from(e)
        })?;

        row.map(Grade::try_from).transpose()
    }

    async fn upsert(&self, grade: &Grade) -> Result<Grade, AppError> {
        // Conflict on assignment_id keeps the original id.
        let row = sqlx::query_as::<_, GradeRow>(
            r#"
            INSERT INTO grades (id, assignment_id, average_score, final_grade, rounding_method, graded_at, graded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (assignment_id) DO UPDATE SET
                average_score = EXCLUDED.average_score,
                final_grade = EXCLUDED.final_grade,
                rounding_method = EXCLUDED.rounding_method,
                graded_at = EXCLUDED.graded_at,
                graded_by = EXCLUDED.graded_by
            RETURNING id, assignment_id, average_score, final_grade, rounding_method, graded_at, graded_by
            "#,
        )
        .bind(&grade.id)
        .bind(&grade.assignment_id)
        .bind(grade.average_score)
        .bind(i16::from(grade.final_grade.value()))
        .bind(grade.rounding_method.as_str())
        .bind(grade.graded_at)
        .bind(&grade.graded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert grade: {:?}", e);
            AppError::from(e)
        })?;

        Grade::try_from(row)
    }

    async fn delete(&self, assignment_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM grades WHERE assignment_id = $1")
            .bind(assignment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_exam(&self, exam_id: &str) -> Result<Vec<Grade>, AppError> {
        let rows = sqlx::query_as::<_, GradeRow>(
            r#"
            SELECT g.id, g.assignment_id, g.average_score, g.final_grade, g.rounding_method, g.graded_at, g.graded_by
            FROM grades g
            JOIN assignments a ON g.assignment_id = a.id
            WHERE a.exam_id = $1
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list grades for exam: {:?}", e);
            AppError::from(e)
        })?;

        rows.into_iter().map(Grade::try_from).collect()
    }
}

const ASSIGNMENT_COLUMNS: &str =
    "id, exam_id, student_id, status, created_at, started_at, submitted_at";

#[async_trait]
impl AssignmentRepository for PgStore {
    async fn find(&self, id: &str) -> Result<Option<Assignment>, AppError> {
        let row = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {} FROM assignments WHERE id = $1",
            ASSIGNMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch assignment: {:?}", e);
            AppError::from(e)
        })?;

        row.map(Assignment::try_from).transpose()
    }

    async fn upsert(&self, assignment: &Assignment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO assignments (id, exam_id, student_id, status, created_at, started_at, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                started_at = EXCLUDED.started_at,
                submitted_at = EXCLUDED.submitted_at
            "#,
        )
        .bind(&assignment.id)
        .bind(&assignment.exam_id)
        .bind(&assignment.student_id)
        .bind(assignment.status.as_str())
        .bind(assignment.created_at)
        .bind(assignment.started_at)
        .bind(assignment.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert assignment: {:?}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_exam(&self, exam_id: &str) -> Result<Vec<Assignment>, AppError> {
        let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {} FROM assignments WHERE exam_id = $1 ORDER BY created_at",
            ASSIGNMENT_COLUMNS
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list assignments: {:?}", e);
            AppError::from(e)
        })?;

        rows.into_iter().map(Assignment::try_from).collect()
    }
}

#[async_trait]
impl AnswerRepository for PgStore {
    async fn find(
        &self,
        assignment_id: &str,
        question_id: &str,
    ) -> Result<Option<StudentAnswer>, AppError> {
        let row = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT assignment_id, question_id, answer, score, feedback, updated_at
            FROM student_answers
            WHERE assignment_id = $1 AND question_id = $2
            "#,
        )
        .bind(assignment_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StudentAnswer::try_from).transpose()
    }

    async fn list_for_assignment(&self, assignment_id: &str) -> Result<Vec<StudentAnswer>, AppError> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT assignment_id, question_id, answer, score, feedback, updated_at
            FROM student_answers
            WHERE assignment_id = $1
            ORDER BY question_id
            "#,
        )
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list answers: {:?}", e);
            AppError::from(e)
        })?;

        rows.into_iter().map(StudentAnswer::try_from).collect()
    }

    async fn upsert(&self, answer: &StudentAnswer) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO student_answers (assignment_id, question_id, answer, score, feedback, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (assignment_id, question_id) DO UPDATE SET
                answer = EXCLUDED.answer,
                score = EXCLUDED.score,
                feedback = EXCLUDED.feedback,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&answer.assignment_id)
        .bind(&answer.question_id)
        .bind(answer.answer.clone().map(Json))
        .bind(answer.score.map(|s| i16::from(s.value())))
        .bind(&answer.feedback)
        .bind(answer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert answer: {:?}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn delete_for_assignment(&self, assignment_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM student_answers WHERE assignment_id = $1")
            .bind(assignment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MonitoringRepository for PgStore {
    async fn record(&self, event: &MonitoringEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO monitoring_events (id, assignment_id, kind, detail, occurred_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&event.id)
        .bind(&event.assignment_id)
        .bind(event.kind.as_str())
        .bind(&event.detail)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record monitoring event: {:?}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn list_for_assignment(&self, assignment_id: &str) -> Result<Vec<MonitoringEvent>, AppError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, assignment_id, kind, detail, occurred_at
            FROM monitoring_events
            WHERE assignment_id = $1
            ORDER BY occurred_at
            "#,
        )
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MonitoringEvent::try_from).collect()
    }

    async fn delete_for_assignment(&self, assignment_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM monitoring_events WHERE assignment_id = $1")
            .bind(assignment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
