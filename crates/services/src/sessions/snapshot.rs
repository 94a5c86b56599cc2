use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use quiz_core::model::{Quiz, ResponseRecord};
use storage::repository::AttemptId;

use super::service::QuizSession;
use crate::error::SessionError;

/// Serializable projection of an in-progress or finished session.
///
/// The quiz travels by value so a snapshot can be restored without a
/// repository round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub quiz: Quiz,
    pub responses: Vec<ResponseRecord>,
    pub current: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set once the attempt has been persisted.
    #[serde(default)]
    pub attempt_id: Option<AttemptId>,
}

impl QuizSession {
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            quiz: Quiz::clone(self.quiz()),
            responses: self.responses().cloned().collect(),
            current: self.current_position(),
            started_at: self.started_at(),
            completed_at: self.completed_at(),
            attempt_id: self.attempt_id(),
        }
    }

    /// Rebuild a session from a snapshot.
    ///
    /// Stored correctness flags are kept as recorded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SnapshotPosition` or
    /// `SessionError::SnapshotDuplicate` for responses that do not map to
    /// exactly one question, and `SessionError::SnapshotCursor` when the
    /// cursor is outside the quiz.
    pub fn restore(snapshot: SessionSnapshot) -> Result<Self, SessionError> {
        let len = snapshot.quiz.len();
        if snapshot.current >= len.max(1) {
            return Err(SessionError::SnapshotCursor {
                current: snapshot.current,
                len,
            });
        }

        let mut slots: Vec<Option<ResponseRecord>> = vec![None; len];
        for response in snapshot.responses {
            let position = response.position;
            let slot = slots
                .get_mut(position)
                .ok_or(SessionError::SnapshotPosition { position, len })?;
            if slot.is_some() {
                return Err(SessionError::SnapshotDuplicate { position });
            }
            *slot = Some(response);
        }

        Ok(QuizSession::from_parts(
            Arc::new(snapshot.quiz),
            slots,
            snapshot.current,
            snapshot.started_at,
            snapshot.completed_at,
            snapshot.attempt_id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Answer, LessonId, Question, QuizId};
    use quiz_core::time::fixed_now;

    fn session() -> QuizSession {
        let quiz = Quiz::new(
            QuizId::random(),
            LessonId::random(),
            vec![
                Question::single_choice("q0", ["a", "b"], 1).unwrap(),
                Question::free_translation("q1", "kifak?").unwrap(),
                Question::ordered_blanks("q2", ["ahwe", "ma3loum"]).unwrap(),
            ],
        );
        QuizSession::start(Arc::new(quiz), fixed_now())
    }

    #[test]
    fn snapshot_survives_json() {
        let mut original = session();
        original.answer_current(Answer::Choice(1), fixed_now());
        original.go_to_next();
        original.answer_current(Answer::text("KIFAK?"), fixed_now());
        original.complete(fixed_now() + Duration::seconds(9));

        let json = serde_json::to_string(&original.snapshot()).unwrap();
        let snapshot: SessionSnapshot = serde_json::from_str(&json).unwrap();
        let restored = QuizSession::restore(snapshot).unwrap();

        assert_eq!(restored.current_position(), 1);
        assert_eq!(restored.answered_count(), 2);
        assert_eq!(restored.correct_count(), 2);
        assert_eq!(restored.completed_at(), original.completed_at());
        assert_eq!(restored.quiz_id(), original.quiz_id());
        assert_eq!(restored.snapshot(), original.snapshot());
    }

    #[test]
    fn stored_attempt_id_survives_restore() {
        let mut original = session();
        original.complete(fixed_now());
        original.mark_stored(7);

        let json = serde_json::to_string(&original.snapshot()).unwrap();
        let restored = QuizSession::restore(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored.attempt_id(), Some(7));
    }

    #[test]
    fn restore_rejects_duplicate_positions() {
        let mut s = session();
        s.answer_current(Answer::Choice(1), fixed_now());
        let mut snapshot = s.snapshot();
        snapshot.responses.push(snapshot.responses[0].clone());

        assert!(matches!(
            QuizSession::restore(snapshot),
            Err(SessionError::SnapshotDuplicate { position: 0 })
        ));
    }

    #[test]
    fn restore_rejects_out_of_range_data() {
        let mut snapshot = session().snapshot();
        snapshot.current = 3;
        assert!(matches!(
            QuizSession::restore(snapshot),
            Err(SessionError::SnapshotCursor { current: 3, len: 3 })
        ));

        let mut snapshot = session().snapshot();
        snapshot.responses.push(ResponseRecord {
            position: 5,
            answer: Answer::Choice(0),
            is_correct: false,
            answered_at: fixed_now(),
        });
        assert!(matches!(
            QuizSession::restore(snapshot),
            Err(SessionError::SnapshotPosition { position: 5, len: 3 })
        ));
    }
}
