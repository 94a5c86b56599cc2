use std::sync::Arc;

use tracing::{debug, info, warn};

use quiz_core::model::{Answer, Quiz, QuizId, ResponseRecord};
use storage::repository::{AttemptId, AttemptRepository, QuizRepository};

use super::service::QuizSession;
use super::summary::{CompletionSummary, KindStats};
use crate::Clock;
use crate::error::SessionError;

/// Result of handing a finished attempt to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResult {
    pub attempt_id: AttemptId,
    pub summary: CompletionSummary,
    pub stats: Vec<KindStats>,
}

/// Accepts quizzes for study and hands finished attempts to persistence.
///
/// Owns the clock so sessions never read system time themselves.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
    require_all_answered: bool,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            attempts,
            require_all_answered: false,
        }
    }

    /// When set, `submit` refuses attempts with unanswered questions.
    #[must_use]
    pub fn with_require_all_answered(mut self, require: bool) -> Self {
        self.require_all_answered = require;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Load a quiz and start a session on it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the quiz cannot be loaded and
    /// `SessionError::InvalidQuiz` if it has too few questions.
    pub async fn start_session(&self, quiz_id: QuizId) -> Result<QuizSession, SessionError> {
        let quiz = self.quizzes.get_quiz(quiz_id).await?;
        self.start_with_quiz(Arc::new(quiz))
    }

    /// Start a session on a quiz already in hand.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidQuiz` if the quiz has too few questions.
    pub fn start_with_quiz(&self, quiz: Arc<Quiz>) -> Result<QuizSession, SessionError> {
        if let Err(err) = quiz.ensure_valid() {
            warn!(quiz_id = %quiz.id(), error = %err, "quiz rejected for study");
            return Err(err.into());
        }
        info!(quiz_id = %quiz.id(), questions = quiz.len(), "starting quiz session");
        Ok(QuizSession::start(quiz, self.clock.now()))
    }

    /// Answer the current question, stamped with the service clock.
    pub fn answer_current(&self, session: &mut QuizSession, answer: Answer) -> Option<ResponseRecord> {
        session.answer_current(answer, self.clock.now()).cloned()
    }

    /// Restart the session on the same quiz, stamped with the service clock.
    pub fn restart(&self, session: &mut QuizSession) {
        session.restart(self.clock.now());
    }

    /// Complete the session and persist the attempt.
    ///
    /// Completing is idempotent, so a failed persist can be retried with
    /// the same session. Once stored, further calls return the stored id
    /// without appending another attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotReady` when all answers are required and
    /// some are missing, `SessionError::Attempt` if the attempt cannot be
    /// built, and `SessionError::Storage` if persisting fails.
    pub async fn submit(&self, session: &mut QuizSession) -> Result<SubmitResult, SessionError> {
        if self.require_all_answered && !session.is_ready_for_submission() {
            return Err(SessionError::NotReady {
                answered: session.answered_count(),
                total: session.total_questions(),
            });
        }

        let now = self.clock.now();
        session.complete(now);

        if let Some(attempt_id) = session.attempt_id() {
            debug!(attempt_id, "attempt already stored");
            return Ok(SubmitResult {
                attempt_id,
                summary: session.completion_summary(now),
                stats: session.kind_stats(),
            });
        }

        let attempt = session.build_attempt()?;
        let attempt_id = self.attempts.append_attempt(&attempt).await?;
        session.mark_stored(attempt_id);

        let summary = session.completion_summary(now);
        info!(
            quiz_id = %session.quiz_id(),
            attempt_id,
            correct = summary.correct_count,
            total = summary.total_count,
            "quiz attempt stored"
        );
        let stats = session.kind_stats();
        for s in &stats {
            debug!(kind = %s.kind, correct = s.correct, total = s.total, "kind stats");
        }

        Ok(SubmitResult {
            attempt_id,
            summary,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{LessonId, Question, QuizAttempt};
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::{AttemptRow, InMemoryRepository, StorageError};

    fn quiz(len: usize) -> Quiz {
        let questions = (0..len)
            .map(|i| Question::free_translation(format!("q{i}"), format!("a{i}")).unwrap())
            .collect();
        Quiz::new(QuizId::random(), LessonId::random(), questions)
    }

    fn service(repo: &InMemoryRepository) -> QuizLoopService {
        QuizLoopService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn short_quiz_is_not_accepted_for_study() {
        let repo = InMemoryRepository::new();
        let short = quiz(2);
        repo.upsert_quiz(&short).await.unwrap();

        let err = service(&repo).start_session(short.id()).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuiz(_)));
    }

    #[tokio::test]
    async fn unknown_quiz_is_a_storage_error() {
        let repo = InMemoryRepository::new();
        let err = service(&repo)
            .start_session(QuizId::random())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
    }

    #[tokio::test]
    async fn strict_policy_blocks_early_submission() {
        let repo = InMemoryRepository::new();
        let q = quiz(3);
        repo.upsert_quiz(&q).await.unwrap();
        let svc = service(&repo).with_require_all_answered(true);

        let mut session = svc.start_session(q.id()).await.unwrap();
        svc.answer_current(&mut session, Answer::text("a0"));

        let err = svc.submit(&mut session).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotReady {
                answered: 1,
                total: 3
            }
        ));
        assert!(!session.is_complete());
    }

    #[tokio::test]
    async fn lenient_policy_stores_partial_attempt() {
        let repo = InMemoryRepository::new();
        let q = quiz(3);
        repo.upsert_quiz(&q).await.unwrap();
        let svc = service(&repo);

        let mut session = svc.start_session(q.id()).await.unwrap();
        let record = svc.answer_current(&mut session, Answer::text("A0")).unwrap();
        assert!(record.is_correct);
        assert_eq!(record.answered_at, fixed_now());

        let result = svc.submit(&mut session).await.unwrap();
        assert_eq!(result.summary.correct_count, 1);
        assert_eq!(result.summary.total_count, 3);

        let stored = repo.get_attempt(result.attempt_id).await.unwrap();
        assert_eq!(stored.responses().len(), 1);
        assert_eq!(stored.total_questions(), 3);
    }

    #[tokio::test]
    async fn resubmitting_returns_stored_attempt() {
        let repo = InMemoryRepository::new();
        let q = quiz(3);
        repo.upsert_quiz(&q).await.unwrap();
        let svc = service(&repo);

        let mut session = svc.start_session(q.id()).await.unwrap();
        svc.answer_current(&mut session, Answer::text("a0"));

        let first = svc.submit(&mut session).await.unwrap();
        let second = svc.submit(&mut session).await.unwrap();
        assert_eq!(first.attempt_id, second.attempt_id);
        assert_eq!(first.summary, second.summary);
        assert_eq!(session.attempt_id(), Some(first.attempt_id));

        let rows = repo.list_attempt_rows(q.id(), 10).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn restart_allows_a_new_attempt() {
        let repo = InMemoryRepository::new();
        let q = quiz(3);
        repo.upsert_quiz(&q).await.unwrap();
        let svc = service(&repo);

        let mut session = svc.start_session(q.id()).await.unwrap();
        let first = svc.submit(&mut session).await.unwrap();

        svc.restart(&mut session);
        assert_eq!(session.attempt_id(), None);
        let second = svc.submit(&mut session).await.unwrap();
        assert_ne!(first.attempt_id, second.attempt_id);
        assert_eq!(repo.list_attempt_rows(q.id(), 10).await.unwrap().len(), 2);
    }

    struct FailingAttempts;

    #[async_trait::async_trait]
    impl AttemptRepository for FailingAttempts {
        async fn append_attempt(&self, _: &QuizAttempt) -> Result<AttemptId, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn get_attempt(&self, _: AttemptId) -> Result<QuizAttempt, StorageError> {
            Err(StorageError::NotFound)
        }

        async fn list_attempt_rows(
            &self,
            _: QuizId,
            _: u32,
        ) -> Result<Vec<AttemptRow>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn failed_persist_leaves_session_retryable() {
        let repo = InMemoryRepository::new();
        let q = Arc::new(quiz(3));
        let offline = QuizLoopService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(FailingAttempts),
        );

        let mut session = offline.start_with_quiz(Arc::clone(&q)).unwrap();
        let err = offline.submit(&mut session).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert!(session.is_complete());
        assert_eq!(session.attempt_id(), None);

        let result = service(&repo).submit(&mut session).await.unwrap();
        assert_eq!(session.attempt_id(), Some(result.attempt_id));
    }
}
