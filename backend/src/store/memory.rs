// src/store/memory.rs

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AnswerRepository, AssignmentRepository, GradeRepository, MonitoringRepository};
use crate::{
    error::AppError,
    models::{
        answer::StudentAnswer, assignment::Assignment, grade::Grade,
        monitoring::MonitoringEvent,
    },
};

/// Store kept entirely in process memory. Used for local development and tests.
#[derive(Default)]
pub struct MemoryStore {
    /// Keyed by assignment id.
    grades: RwLock<HashMap<String, Grade>>,
    assignments: RwLock<HashMap<String, Assignment>>,
    /// Keyed by (assignment id, question id).
    answers: RwLock<BTreeMap<(String, String), StudentAnswer>>,
    events: RwLock<Vec<MonitoringEvent>>,
}

impl MemoryStore {
    async fn assignment_ids_for_exam(&self, exam_id: &str) -> HashSet<String> {
        self.assignments
            .read()
            .await
            .values()
            .filter(|a| a.exam_id == exam_id)
            .map(|a| a.id.clone())
            .collect()
    }
}

#[async_trait]
impl GradeRepository for MemoryStore {
    async fn find(&self, assignment_id: &str) -> Result<Option<Grade>, AppError> {
        Ok(self.grades.read().await.get(assignment_id).cloned())
    }

    async fn upsert(&self, grade: &Grade) -> Result<Grade, AppError> {
        let mut grades = self.grades.write().await;
        let stored = match grades.get(&grade.assignment_id) {
            Some(existing) => Grade {
                id: existing.id.clone(),
                ..grade.clone()
            },
            None => grade.clone(),
        };
        grades.insert(stored.assignment_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, assignment_id: &str) -> Result<bool, AppError> {
        Ok(self.grades.write().await.remove(assignment_id).is_some())
    }

    async fn list_for_exam(&self, exam_id: &str) -> Result<Vec<Grade>, AppError> {
        let ids = self.assignment_ids_for_exam(exam_id).await;
        Ok(self
            .grades
            .read()
            .await
            .values()
            .filter(|g| ids.contains(&g.assignment_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AssignmentRepository for MemoryStore {
    async fn find(&self, id: &str) -> Result<Option<Assignment>, AppError> {
        Ok(self.assignments.read().await.get(id).cloned())
    }

    async fn upsert(&self, assignment: &Assignment) -> Result<(), AppError> {
        self.assignments
            .write()
            .await
            .insert(assignment.id.clone(), assignment.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.assignments.write().await.remove(id).is_some())
    }

    async fn list_for_exam(&self, exam_id: &str) -> Result<Vec<Assignment>, AppError> {
        let mut assignments: Vec<Assignment> = self
            .assignments
            .read()
            .await
            .values()
            .filter(|a| a.exam_id == exam_id)
            .cloned()
            .collect();
        assignments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(assignments)
    }
}

#[async_trait]
impl AnswerRepository for MemoryStore {
    async fn find(
        &self,
        assignment_id: &str,
        question_id: &str,
    ) -> Result<Option<StudentAnswer>, AppError> {
        let key = (assignment_id.to_owned(), question_id.to_owned());
        Ok(self.answers.read().await.get(&key).cloned())
    }

    async fn list_for_assignment(&self, assignment_id: &str) -> Result<Vec<StudentAnswer>, AppError> {
        Ok(self
            .answers
            .read()
            .await
            .values()
            .filter(|a| a.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, answer: &StudentAnswer) -> Result<(), AppError> {
        let key = (answer.assignment_id.clone(), answer.question_id.clone());
        self.answers.write().await.insert(key, answer.clone());
        Ok(())
    }

    async fn delete_for_assignment(&self, assignment_id: &str) -> Result<u64, AppError> {
        let mut answers = self.answers.write().await;
        let before = answers.len();
        answers.retain(|(a, _), _| a != assignment_id);
        Ok((before - answers.len()) as u64)
    }
}

#[async_trait]
impl MonitoringRepository for MemoryStore {
    async fn record(&self, event: &MonitoringEvent) -> Result<(), AppError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn list_for_assignment(&self, assignment_id: &str) -> Result<Vec<MonitoringEvent>, AppError> {
        let mut events: Vec<MonitoringEvent> = self
            .events
            .read()
            .await
            .iter()
            .filter(|e| e.assignment_id == assignment_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));
        Ok(events)
    }

    async fn delete_for_assignment(&self, assignment_id: &str) -> Result<u64, AppError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| e.assignment_id != assignment_id);
        Ok((before - events.len()) as u64)
    }
}
