use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, QuizId};
use crate::model::question::QuestionKind;
use crate::model::quiz::Quiz;
use crate::model::response::ResponseRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many questions for a single attempt: {len}")]
    TooManyQuestions { len: usize },

    #[error("response for position {position} is outside a quiz of {len} questions")]
    ResponseOutOfRange { position: usize, len: usize },

    #[error("correct answers ({correct}) exceed total questions ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },

    #[error("{kind} tally has {correct} correct out of {total}")]
    InvalidTally {
        kind: QuestionKind,
        correct: u32,
        total: u32,
    },

    #[error("correct answers ({correct}) do not match per-type counts ({sum})")]
    CountMismatch { correct: u32, sum: u32 },

    #[error("answered questions ({answered}) exceed total questions ({total})")]
    AnsweredExceedsTotal { answered: u32, total: u32 },

    #[error("{responses} responses stored for {answered} answered questions")]
    ResponseCountMismatch { responses: usize, answered: u32 },
}

//
// ─── TALLIES ──────────────────────────────────────────────────────────────────
//

/// Correct/answered counts for one question kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTally {
    pub correct: u32,
    pub total: u32,
}

impl KindTally {
    #[must_use]
    pub fn new(correct: u32, total: u32) -> Self {
        Self { correct, total }
    }

    /// `correct / total`, or `0.0` for an empty bucket.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.total)
        }
    }

    fn record(&mut self, is_correct: bool) {
        self.total = self.total.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
    }
}

/// Tallies for every question kind, one column per kind in storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTallies {
    pub single_choice: KindTally,
    pub free_translation: KindTally,
    pub ordered_blanks: KindTally,
}

impl KindTallies {
    #[must_use]
    pub fn get(&self, kind: QuestionKind) -> KindTally {
        match kind {
            QuestionKind::SingleChoice => self.single_choice,
            QuestionKind::FreeTranslation => self.free_translation,
            QuestionKind::OrderedBlanks => self.ordered_blanks,
        }
    }

    fn get_mut(&mut self, kind: QuestionKind) -> &mut KindTally {
        match kind {
            QuestionKind::SingleChoice => &mut self.single_choice,
            QuestionKind::FreeTranslation => &mut self.free_translation,
            QuestionKind::OrderedBlanks => &mut self.ordered_blanks,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionKind, KindTally)> + '_ {
        QuestionKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    fn correct_sum(&self) -> u32 {
        self.iter().map(|(_, t)| t.correct).sum()
    }

    fn answered_sum(&self) -> u32 {
        self.iter().map(|(_, t)| t.total).sum()
    }
}

//
// ─── ATTEMPT ──────────────────────────────────────────────────────────────────
//

/// Finished quiz attempt handed to persistence and analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    quiz_id: QuizId,
    lesson_id: LessonId,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_questions: u32,
    correct_answers: u32,
    tallies: KindTallies,
    responses: Vec<ResponseRecord>,
}

impl QuizAttempt {
    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the time range is inverted or the counts
    /// do not agree with each other or with the stored responses.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        quiz_id: QuizId,
        lesson_id: LessonId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_questions: u32,
        correct_answers: u32,
        tallies: KindTallies,
        responses: Vec<ResponseRecord>,
    ) -> Result<Self, AttemptError> {
        if completed_at < started_at {
            return Err(AttemptError::InvalidTimeRange);
        }
        if correct_answers > total_questions {
            return Err(AttemptError::CorrectExceedsTotal {
                correct: correct_answers,
                total: total_questions,
            });
        }
        for (kind, tally) in tallies.iter() {
            if tally.correct > tally.total {
                return Err(AttemptError::InvalidTally {
                    kind,
                    correct: tally.correct,
                    total: tally.total,
                });
            }
        }
        let sum = tallies.correct_sum();
        if sum != correct_answers {
            return Err(AttemptError::CountMismatch {
                correct: correct_answers,
                sum,
            });
        }
        let answered = tallies.answered_sum();
        if answered > total_questions {
            return Err(AttemptError::AnsweredExceedsTotal {
                answered,
                total: total_questions,
            });
        }
        if u32::try_from(responses.len()).ok() != Some(answered) {
            return Err(AttemptError::ResponseCountMismatch {
                responses: responses.len(),
                answered,
            });
        }

        Ok(Self {
            quiz_id,
            lesson_id,
            started_at,
            completed_at,
            total_questions,
            correct_answers,
            tallies,
            responses,
        })
    }

    /// Build an attempt from a quiz and the responses collected for it.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidTimeRange` for an inverted range,
    /// `AttemptError::ResponseOutOfRange` for a position the quiz does not
    /// have, and `AttemptError::TooManyQuestions` if counts overflow `u32`.
    pub fn from_responses(
        quiz: &Quiz,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        responses: &[ResponseRecord],
    ) -> Result<Self, AttemptError> {
        let total_questions = u32::try_from(quiz.len())
            .map_err(|_| AttemptError::TooManyQuestions { len: quiz.len() })?;

        let mut tallies = KindTallies::default();
        let mut correct_answers = 0_u32;
        for response in responses {
            let question =
                quiz.question(response.position)
                    .ok_or(AttemptError::ResponseOutOfRange {
                        position: response.position,
                        len: quiz.len(),
                    })?;
            tallies.get_mut(question.kind()).record(response.is_correct);
            if response.is_correct {
                correct_answers = correct_answers.saturating_add(1);
            }
        }

        Self::from_persisted(
            quiz.id(),
            quiz.lesson_id(),
            started_at,
            completed_at,
            total_questions,
            correct_answers,
            tallies,
            responses.to_vec(),
        )
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn tallies(&self) -> &KindTallies {
        &self.tallies
    }

    #[must_use]
    pub fn responses(&self) -> &[ResponseRecord] {
        &self.responses
    }

    /// Fraction of all questions answered correctly, `0.0` for an empty quiz.
    #[must_use]
    pub fn score(&self) -> f64 {
        KindTally::new(self.correct_answers, self.total_questions).accuracy()
    }

    #[must_use]
    pub fn time_taken_seconds(&self) -> i64 {
        (self.completed_at - self.started_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, Question};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn quiz() -> Quiz {
        Quiz::new(
            QuizId::random(),
            LessonId::random(),
            vec![
                Question::single_choice("q1", ["a", "b"], 1).unwrap(),
                Question::free_translation("q2", "kifak?").unwrap(),
                Question::ordered_blanks("q3", ["ahwe", "ma3loum"]).unwrap(),
            ],
        )
    }

    fn record(quiz: &Quiz, position: usize, answer: Answer) -> ResponseRecord {
        ResponseRecord::evaluate(position, quiz.question(position).unwrap(), answer, fixed_now())
    }

    #[test]
    fn attempt_tallies_by_kind() {
        let quiz = quiz();
        let responses = vec![
            record(&quiz, 0, Answer::Choice(1)),
            record(&quiz, 1, Answer::text("Kifak?")),
            record(&quiz, 2, Answer::blanks(["ahwe", "wrong"])),
        ];
        let started = fixed_now();
        let attempt =
            QuizAttempt::from_responses(&quiz, started, started + Duration::seconds(75), &responses)
                .unwrap();

        assert_eq!(attempt.total_questions(), 3);
        assert_eq!(attempt.correct_answers(), 2);
        assert_eq!(attempt.tallies().single_choice, KindTally::new(1, 1));
        assert_eq!(attempt.tallies().free_translation, KindTally::new(1, 1));
        assert_eq!(attempt.tallies().ordered_blanks, KindTally::new(0, 1));
        assert!((attempt.score() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(attempt.time_taken_seconds(), 75);
    }

    #[test]
    fn empty_bucket_accuracy_is_zero() {
        assert_eq!(KindTally::default().accuracy(), 0.0);
    }

    #[test]
    fn inverted_time_range_is_rejected() {
        let quiz = quiz();
        let err = QuizAttempt::from_responses(
            &quiz,
            fixed_now(),
            fixed_now() - Duration::seconds(1),
            &[],
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::InvalidTimeRange);
    }

    #[test]
    fn persisted_counts_must_agree() {
        let now = fixed_now();
        let tallies = KindTallies {
            single_choice: KindTally::new(1, 1),
            ..KindTallies::default()
        };
        let err = QuizAttempt::from_persisted(
            QuizId::random(),
            LessonId::random(),
            now,
            now,
            3,
            2,
            tallies,
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::CountMismatch { correct: 2, sum: 1 });
    }

    #[test]
    fn persisted_responses_must_match_tallies() {
        let now = fixed_now();
        let tallies = KindTallies {
            free_translation: KindTally::new(0, 1),
            ..KindTallies::default()
        };
        let err = QuizAttempt::from_persisted(
            QuizId::random(),
            LessonId::random(),
            now,
            now,
            3,
            0,
            tallies,
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AttemptError::ResponseCountMismatch { .. }));
    }

    #[test]
    fn response_outside_quiz_is_rejected() {
        let quiz = quiz();
        let stray = ResponseRecord {
            position: 7,
            answer: Answer::Choice(0),
            is_correct: false,
            answered_at: fixed_now(),
        };
        let err = QuizAttempt::from_responses(&quiz, fixed_now(), fixed_now(), &[stray])
            .unwrap_err();
        assert_eq!(err, AttemptError::ResponseOutOfRange { position: 7, len: 3 });
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let quiz = Quiz::new(QuizId::random(), LessonId::random(), Vec::new());
        let attempt = QuizAttempt::from_responses(&quiz, fixed_now(), fixed_now(), &[]).unwrap();
        assert_eq!(attempt.score(), 0.0);
    }
}
