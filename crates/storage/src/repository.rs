use async_trait::async_trait;
use quiz_core::model::{LessonId, Quiz, QuizAttempt, QuizId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier for a persisted attempt.
///
/// `i64` to match `SQLite` row ids.
pub type AttemptId = i64;

/// A persisted attempt with its storage id.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRow {
    pub id: AttemptId,
    pub attempt: QuizAttempt,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: AttemptId, attempt: QuizAttempt) -> Self {
        Self { id, attempt }
    }
}

/// Supply side: quizzes fetched from the generator and cached locally.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist or replace a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Fetch a quiz by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError>;

    /// All quizzes generated for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quizzes_for_lesson(&self, lesson_id: LessonId) -> Result<Vec<Quiz>, StorageError>;
}

/// Hand-off side: finished attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append an attempt and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<AttemptId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<QuizAttempt, StorageError>;

    /// Most recent attempts for a quiz, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempt_rows(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<HashMap<QuizId, Quiz>>>,
    attempts: Arc<Mutex<Vec<QuizAttempt>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        guard.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_quizzes_for_lesson(&self, lesson_id: LessonId) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        let mut found: Vec<Quiz> = guard
            .values()
            .filter(|q| q.lesson_id() == lesson_id)
            .cloned()
            .collect();
        found.sort_by_key(Quiz::id);
        Ok(found)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<AttemptId, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        guard.push(attempt.clone());
        AttemptId::try_from(guard.len()).map_err(|_| StorageError::Conflict)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<QuizAttempt, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|index| guard.get(index))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_attempt_rows(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut rows: Vec<AttemptRow> = guard
            .iter()
            .enumerate()
            .filter(|(_, a)| a.quiz_id() == quiz_id)
            .filter_map(|(index, a)| {
                AttemptId::try_from(index + 1)
                    .ok()
                    .map(|id| AttemptRow::new(id, a.clone()))
            })
            .collect();
        rows.sort_by(|a, b| {
            b.attempt
                .completed_at()
                .cmp(&a.attempt.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(limit);
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}
