use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::answer::Answer;
use crate::model::question::Question;

/// One submitted answer bound to a question position.
///
/// `is_correct` is computed once, when the record is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub position: usize,
    pub answer: Answer,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

impl ResponseRecord {
    /// Evaluate `answer` against `question` and record the outcome.
    #[must_use]
    pub fn evaluate(
        position: usize,
        question: &Question,
        answer: Answer,
        answered_at: DateTime<Utc>,
    ) -> Self {
        let is_correct = question.is_correct(&answer);
        Self {
            position,
            answer,
            is_correct,
            answered_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn evaluation_happens_at_construction() {
        let q = Question::free_translation("How are you?", "kifak?").unwrap();
        let right = ResponseRecord::evaluate(4, &q, Answer::text("KIFAK?"), fixed_now());
        let wrong = ResponseRecord::evaluate(4, &q, Answer::Choice(0), fixed_now());

        assert!(right.is_correct);
        assert!(!wrong.is_correct);
        assert_eq!(right.position, 4);
        assert_eq!(right.answered_at, fixed_now());
    }
}
