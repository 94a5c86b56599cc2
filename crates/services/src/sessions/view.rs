use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{QuizAttempt, QuizId};
use storage::repository::{AttemptId, AttemptRepository};

use crate::error::SessionError;

/// Presentation-agnostic list item for a past attempt.
///
/// No pre-formatted strings; the caller formats scores and times.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub completed_at: DateTime<Utc>,
    pub score: f64,
    pub correct: u32,
    pub total: u32,
    pub time_taken_seconds: i64,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_attempt(id: AttemptId, attempt: &QuizAttempt) -> Self {
        Self {
            id,
            completed_at: attempt.completed_at(),
            score: attempt.score(),
            correct: attempt.correct_answers(),
            total: attempt.total_questions(),
            time_taken_seconds: attempt.time_taken_seconds(),
        }
    }
}

/// Read side over persisted attempts.
#[derive(Clone)]
pub struct QuizAttemptService {
    attempts: Arc<dyn AttemptRepository>,
}

impl QuizAttemptService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { attempts }
    }

    /// Most recent attempts for a quiz, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent_attempts(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptListItem>, SessionError> {
        let rows = self.attempts.list_attempt_rows(quiz_id, limit).await?;
        Ok(rows
            .iter()
            .map(|row| AttemptListItem::from_attempt(row.id, &row.attempt))
            .collect())
    }

    /// Highest score among the most recent `limit` attempts.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn best_score(&self, quiz_id: QuizId, limit: u32) -> Result<Option<f64>, SessionError> {
        let items = self.list_recent_attempts(quiz_id, limit).await?;
        Ok(items.iter().map(|i| i.score).reduce(f64::max))
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the attempt is missing or the
    /// repository fails.
    pub async fn get_attempt(&self, id: AttemptId) -> Result<QuizAttempt, SessionError> {
        Ok(self.attempts.get_attempt(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Answer, LessonId, Question, Quiz, ResponseRecord};
    use quiz_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn quiz() -> Quiz {
        Quiz::new(
            QuizId::random(),
            LessonId::random(),
            vec![
                Question::single_choice("q0", ["a", "b"], 1).unwrap(),
                Question::free_translation("q1", "kifak?").unwrap(),
                Question::ordered_blanks("q2", ["ahwe"]).unwrap(),
            ],
        )
    }

    fn attempt(quiz: &Quiz, correct_first: bool, minutes: i64) -> QuizAttempt {
        let at = fixed_now() + Duration::minutes(minutes);
        let answer = Answer::Choice(if correct_first { 1 } else { 0 });
        let response = ResponseRecord::evaluate(0, quiz.question(0).unwrap(), answer, at);
        QuizAttempt::from_responses(quiz, at, at + Duration::seconds(20), &[response]).unwrap()
    }

    #[test]
    fn list_item_is_presentation_agnostic() {
        let quiz = quiz();
        let item = AttemptListItem::from_attempt(42, &attempt(&quiz, true, 0));
        assert_eq!(item.id, 42);
        assert_eq!(item.correct, 1);
        assert_eq!(item.total, 3);
        assert_eq!(item.time_taken_seconds, 20);
    }

    #[tokio::test]
    async fn lists_recent_attempts_and_best_score() {
        let repo = InMemoryRepository::new();
        let quiz = quiz();
        repo.append_attempt(&attempt(&quiz, false, 0)).await.unwrap();
        let best = repo.append_attempt(&attempt(&quiz, true, 5)).await.unwrap();

        let svc = QuizAttemptService::new(Arc::new(repo));
        let items = svc.list_recent_attempts(quiz.id(), 10).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, best);

        let score = svc.best_score(quiz.id(), 10).await.unwrap().unwrap();
        assert!((score - 1.0 / 3.0).abs() < 1e-9);

        assert_eq!(svc.best_score(QuizId::random(), 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_attempt_is_a_storage_error() {
        let svc = QuizAttemptService::new(Arc::new(InMemoryRepository::new()));
        assert!(matches!(
            svc.get_attempt(99).await,
            Err(SessionError::Storage(_))
        ));
    }
}
