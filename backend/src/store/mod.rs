// src/store/mod.rs

//! Repository interfaces the handlers and the grading workflow depend on.
//!
//! Implementations are injected through `AppState`; nothing reaches for a
//! process-wide store.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        answer::StudentAnswer,
        assignment::{Assignment, AssignmentStatus},
        grade::Grade,
        monitoring::MonitoringEvent,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait GradeRepository: Send + Sync {
    async fn find(&self, assignment_id: &str) -> Result<Option<Grade>, AppError>;

    /// Inserts or replaces the grade of `grade.assignment_id`. Never creates a second row.
    ///
    /// Returns the grade as stored: when a row already exists its id is kept,
    /// whatever id `grade` carries.
    async fn upsert(&self, grade: &Grade) -> Result<Grade, AppError>;

    /// Returns whether a grade was removed.
    async fn delete(&self, assignment_id: &str) -> Result<bool, AppError>;

    async fn list_for_exam(&self, exam_id: &str) -> Result<Vec<Grade>, AppError>;
}

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn find(&self, id: &str) -> Result<Option<Assignment>, AppError>;

    async fn upsert(&self, assignment: &Assignment) -> Result<(), AppError>;

    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    async fn list_for_exam(&self, exam_id: &str) -> Result<Vec<Assignment>, AppError>;

    /// Moves the stored assignment to `status` if that is not a regression.
    async fn advance_status(
        &self,
        id: &str,
        status: AssignmentStatus,
    ) -> Result<Assignment, AppError> {
        let mut assignment = self
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assignment '{}' not found", id)))?;

        if assignment.status != status {
            assignment.transition(status)?;
            self.upsert(&assignment).await?;
        }
        Ok(assignment)
    }
}

#[async_trait]
pub trait AnswerRepository: Send + Sync {
    async fn find(
        &self,
        assignment_id: &str,
        question_id: &str,
    ) -> Result<Option<StudentAnswer>, AppError>;

    /// Answers of one assignment ordered by question id.
    async fn list_for_assignment(&self, assignment_id: &str) -> Result<Vec<StudentAnswer>, AppError>;

    async fn upsert(&self, answer: &StudentAnswer) -> Result<(), AppError>;

    /// Removes every answer of the assignment, returning how many were removed.
    async fn delete_for_assignment(&self, assignment_id: &str) -> Result<u64, AppError>;
}

#[async_trait]
pub trait MonitoringRepository: Send + Sync {
    async fn record(&self, event: &MonitoringEvent) -> Result<(), AppError>;

    /// Events of one assignment, oldest first.
    async fn list_for_assignment(&self, assignment_id: &str) -> Result<Vec<MonitoringEvent>, AppError>;

    async fn delete_for_assignment(&self, assignment_id: &str) -> Result<u64, AppError>;
}

/// The set of repositories a request may touch.
#[derive(Clone)]
pub struct Store {
    pub grades: Arc<dyn GradeRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub answers: Arc<dyn AnswerRepository>,
    pub events: Arc<dyn MonitoringRepository>,
}

impl Store {
    /// Backs every repository with one shared implementation.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: GradeRepository + AssignmentRepository + AnswerRepository + MonitoringRepository + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            grades: backend.clone(),
            assignments: backend.clone(),
            answers: backend.clone(),
            events: backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend(MemoryStore::default())
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::from_backend(PgStore::new(pool))
    }
}
