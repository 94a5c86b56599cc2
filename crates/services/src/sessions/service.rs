use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use quiz_core::model::{Answer, Question, Quiz, QuizAttempt, QuizId, ResponseRecord};
use storage::repository::AttemptId;

use super::progress::NavigationView;
use super::summary::{CompletionSummary, KindStats, ReviewItem};
use crate::error::SessionError;

/// Lifecycle of a study attempt.
///
/// `NotStarted` is only observable through [`super::QuizStudy`]; a
/// `QuizSession` value is always `Active` or `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Active,
    Completed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one learner's attempt at a quiz.
///
/// Every transition is total: a call whose precondition does not hold
/// leaves the session untouched and reports `false`/`None`.
pub struct QuizSession {
    quiz: Arc<Quiz>,
    responses: Vec<Option<ResponseRecord>>,
    current: usize,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    attempt_id: Option<AttemptId>,
}

impl QuizSession {
    /// Begin an attempt at position 0 with no answers.
    ///
    /// Quiz size is not checked here; accepting a quiz for study is the
    /// caller's decision (see `QuizLoopService`).
    #[must_use]
    pub fn start(quiz: Arc<Quiz>, started_at: DateTime<Utc>) -> Self {
        let responses = vec![None; quiz.len()];
        debug!(quiz_id = %quiz.id(), questions = quiz.len(), "quiz session started");
        Self {
            quiz,
            responses,
            current: 0,
            started_at,
            completed_at: None,
            attempt_id: None,
        }
    }

    /// Rebuild a session from already-checked parts.
    pub(crate) fn from_parts(
        quiz: Arc<Quiz>,
        responses: Vec<Option<ResponseRecord>>,
        current: usize,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        attempt_id: Option<AttemptId>,
    ) -> Self {
        Self {
            quiz,
            responses,
            current,
            started_at,
            completed_at,
            attempt_id,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Arc<Quiz> {
        &self.quiz
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz.id()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Id of the stored attempt once this session has been persisted.
    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.attempt_id
    }

    pub(crate) fn mark_stored(&mut self, id: AttemptId) {
        self.attempt_id = Some(id);
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.completed_at.is_some() {
            SessionState::Completed
        } else {
            SessionState::Active
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn current_position(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.quiz.len()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.question(self.current)
    }

    #[must_use]
    pub fn response(&self, position: usize) -> Option<&ResponseRecord> {
        self.responses.get(position).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn current_response(&self) -> Option<&ResponseRecord> {
        self.response(self.current)
    }

    /// Recorded responses in quiz order.
    pub fn responses(&self) -> impl Iterator<Item = &ResponseRecord> + '_ {
        self.responses.iter().flatten()
    }

    #[must_use]
    pub fn is_answered(&self, position: usize) -> bool {
        self.response(position).is_some()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.responses().count()
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.responses().filter(|r| r.is_correct).count()
    }

    /// Forward movement requires an answer at the current position and a
    /// question after it.
    #[must_use]
    pub fn can_go_next(&self) -> bool {
        self.is_answered(self.current) && self.current + 1 < self.total_questions()
    }

    /// Backward movement never requires an answer.
    #[must_use]
    pub fn can_go_previous(&self) -> bool {
        self.current > 0
    }

    /// True once every question has a response. Advisory: `complete`
    /// does not check it.
    #[must_use]
    pub fn is_ready_for_submission(&self) -> bool {
        self.responses.iter().all(Option::is_some)
    }

    //
    // ─── TRANSITIONS ──────────────────────────────────────────────────────────
    //

    /// Evaluate `answer` against the current question and store it,
    /// replacing any earlier answer for that position. The cursor does not
    /// move.
    ///
    /// Returns `None` when there is no current question (empty quiz).
    pub fn answer_current(
        &mut self,
        answer: Answer,
        answered_at: DateTime<Utc>,
    ) -> Option<&ResponseRecord> {
        let position = self.current;
        let Some(question) = self.quiz.question(position) else {
            trace!(position, "answer ignored: no current question");
            return None;
        };
        let record = ResponseRecord::evaluate(position, question, answer, answered_at);
        debug!(position, correct = record.is_correct, "answer recorded");

        let slot = self.responses.get_mut(position)?;
        *slot = Some(record);
        slot.as_ref()
    }

    /// Advance one question. No-op unless the current question is answered
    /// and is not the last one.
    pub fn go_to_next(&mut self) -> bool {
        if !self.can_go_next() {
            trace!(position = self.current, "next ignored");
            return false;
        }
        self.current += 1;
        debug!(position = self.current, "moved to next question");
        true
    }

    /// Step back one question. No-op at position 0.
    pub fn go_to_previous(&mut self) -> bool {
        if !self.can_go_previous() {
            trace!("previous ignored at first question");
            return false;
        }
        self.current -= 1;
        debug!(position = self.current, "moved to previous question");
        true
    }

    /// Jump straight to `index`.
    ///
    /// This bypasses the answer gate that `go_to_next` enforces; it exists
    /// for review and jump-list navigation. No-op when `index` is out of
    /// range.
    pub fn go_to_question(&mut self, index: usize) -> bool {
        if index >= self.total_questions() {
            trace!(index, total = self.total_questions(), "jump ignored");
            return false;
        }
        self.current = index;
        debug!(position = index, "jumped to question");
        true
    }

    /// Mark the attempt finished, whether or not every question was
    /// answered. Only the first call records `completed_at`.
    pub fn complete(&mut self, completed_at: DateTime<Utc>) -> bool {
        if self.completed_at.is_some() {
            trace!("complete ignored: already completed");
            return false;
        }
        self.completed_at = Some(completed_at);
        debug!(
            answered = self.answered_count(),
            total = self.total_questions(),
            "quiz session completed"
        );
        true
    }

    /// Start over on the same quiz: position 0, no answers, not completed.
    pub fn restart(&mut self, started_at: DateTime<Utc>) {
        self.responses = vec![None; self.quiz.len()];
        self.current = 0;
        self.completed_at = None;
        self.attempt_id = None;
        self.started_at = started_at;
        debug!(quiz_id = %self.quiz.id(), "quiz session restarted");
    }

    //
    // ─── DERIVED VIEWS ────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn navigation(&self) -> NavigationView {
        NavigationView::of(self)
    }

    #[must_use]
    pub fn completion_summary(&self, now: DateTime<Utc>) -> CompletionSummary {
        CompletionSummary::of(self, now)
    }

    #[must_use]
    pub fn kind_stats(&self) -> Vec<KindStats> {
        KindStats::of(self)
    }

    #[must_use]
    pub fn review_items(&self) -> Vec<ReviewItem<'_>> {
        ReviewItem::list(self)
    }

    /// Build the hand-off record for a completed session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` before `complete` has been
    /// called, or `SessionError::Attempt` if the counts cannot be built.
    pub fn build_attempt(&self) -> Result<QuizAttempt, SessionError> {
        let completed_at = self.completed_at.ok_or(SessionError::NotCompleted)?;
        let responses: Vec<ResponseRecord> = self.responses().cloned().collect();
        Ok(QuizAttempt::from_responses(
            &self.quiz,
            self.started_at,
            completed_at,
            &responses,
        )?)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("quiz_id", &self.quiz.id())
            .field("questions", &self.quiz.len())
            .field("current", &self.current)
            .field("answered", &self.answered_count())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .field("attempt_id", &self.attempt_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
