use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use quiz_core::model::Quiz;

use super::service::{QuizSession, SessionState};

/// Holds the session for one study attempt, or nothing.
///
/// Owned by whatever screen or command drives the attempt. `reset`
/// discards the session; a new `start` is needed to continue.
#[derive(Debug, Default)]
pub struct QuizStudy {
    session: Option<QuizSession>,
}

impl QuizStudy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session, replacing any current one.
    pub fn start(&mut self, quiz: Arc<Quiz>, started_at: DateTime<Utc>) -> &mut QuizSession {
        self.session.insert(QuizSession::start(quiz, started_at))
    }

    /// Adopt a session built elsewhere (for example by `QuizLoopService`
    /// or a restored snapshot).
    pub fn resume(&mut self, session: QuizSession) -> &mut QuizSession {
        self.session.insert(session)
    }

    /// Drop the current session, returning it if there was one.
    pub fn reset(&mut self) -> Option<QuizSession> {
        let discarded = self.session.take();
        if let Some(session) = &discarded {
            debug!(quiz_id = %session.quiz_id(), "quiz session discarded");
        }
        discarded
    }

    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut QuizSession> {
        self.session.as_mut()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::NotStarted, QuizSession::state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Answer, LessonId, Question, QuizId};
    use quiz_core::time::fixed_now;

    fn quiz() -> Arc<Quiz> {
        Arc::new(Quiz::new(
            QuizId::random(),
            LessonId::random(),
            vec![Question::free_translation("q", "a").unwrap()],
        ))
    }

    #[test]
    fn lifecycle_runs_not_started_active_completed() {
        let mut study = QuizStudy::new();
        assert_eq!(study.state(), SessionState::NotStarted);

        study.start(quiz(), fixed_now());
        assert_eq!(study.state(), SessionState::Active);

        let session = study.session_mut().unwrap();
        session.answer_current(Answer::text("a"), fixed_now());
        session.complete(fixed_now());
        assert_eq!(study.state(), SessionState::Completed);
    }

    #[test]
    fn reset_discards_session() {
        let mut study = QuizStudy::new();
        study.start(quiz(), fixed_now());

        let discarded = study.reset().unwrap();
        assert_eq!(discarded.current_position(), 0);
        assert!(study.session().is_none());
        assert_eq!(study.state(), SessionState::NotStarted);
        assert!(study.reset().is_none());
    }

    #[test]
    fn start_replaces_existing_session() {
        let mut study = QuizStudy::new();
        let first = quiz();
        let second = quiz();
        study.start(Arc::clone(&first), fixed_now());
        study.start(Arc::clone(&second), fixed_now());
        assert_eq!(study.session().unwrap().quiz_id(), second.id());
    }
}
