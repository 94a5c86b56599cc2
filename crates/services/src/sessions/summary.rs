use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use quiz_core::model::{Answer, Question, QuestionKind};

use super::progress::ratio;
use super::service::QuizSession;

//
// ─── COMPLETION SUMMARY ───────────────────────────────────────────────────────
//

/// Score and timing of an attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionSummary {
    /// `correct_count / total_count`, `0.0` for an empty quiz.
    pub score: f64,
    pub correct_count: usize,
    pub total_count: usize,
    #[serde(serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
}

fn serialize_seconds<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_seconds())
}

impl CompletionSummary {
    /// Elapsed time runs from `started_at` to `completed_at`, or to `now`
    /// while the session is still active.
    #[must_use]
    pub fn of(session: &QuizSession, now: DateTime<Utc>) -> Self {
        let correct_count = session.correct_count();
        let total_count = session.total_questions();
        let end = session.completed_at().unwrap_or(now);
        Self {
            score: ratio(correct_count, total_count),
            correct_count,
            total_count,
            elapsed: (end - session.started_at()).max(Duration::zero()),
        }
    }
}

//
// ─── PER-KIND STATISTICS ──────────────────────────────────────────────────────
//

/// Correct/answered counts for one question kind present in the quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub kind: QuestionKind,
    pub correct: usize,
    pub total: usize,
}

impl KindStats {
    /// One entry per kind present in the quiz, in order of first
    /// appearance. Kinds with no responses report `0/0`.
    #[must_use]
    pub fn of(session: &QuizSession) -> Vec<Self> {
        let quiz = session.quiz();
        quiz.kinds()
            .into_iter()
            .map(|kind| {
                let mut stats = Self {
                    kind,
                    correct: 0,
                    total: 0,
                };
                let matching = session
                    .responses()
                    .filter(|r| quiz.question(r.position).is_some_and(|q| q.kind() == kind));
                for response in matching {
                    stats.total += 1;
                    if response.is_correct {
                        stats.correct += 1;
                    }
                }
                stats
            })
            .collect()
    }

    /// `correct / total`, `0.0` for an empty bucket.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.total)
    }
}

//
// ─── REVIEW LIST ──────────────────────────────────────────────────────────────
//

/// One row of the post-attempt review screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem<'a> {
    pub position: usize,
    pub question: &'a Question,
    pub answer: Option<&'a Answer>,
    /// `false` for unanswered questions.
    pub is_correct: bool,
}

impl<'a> ReviewItem<'a> {
    /// Every question in quiz order, answered or not.
    #[must_use]
    pub fn list(session: &'a QuizSession) -> Vec<Self> {
        session
            .quiz()
            .questions()
            .iter()
            .enumerate()
            .map(|(position, question)| {
                let response = session.response(position);
                Self {
                    position,
                    question,
                    answer: response.map(|r| &r.answer),
                    is_correct: response.is_some_and(|r| r.is_correct),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{LessonId, Quiz, QuizId};
    use quiz_core::time::fixed_now;
    use std::sync::Arc;

    fn build_quiz(questions: Vec<Question>) -> Arc<Quiz> {
        Arc::new(Quiz::new(QuizId::random(), LessonId::random(), questions))
    }

    fn mixed() -> Arc<Quiz> {
        build_quiz(vec![
            Question::single_choice("q0", ["a", "b"], 1).unwrap(),
            Question::free_translation("q1", "kifak?").unwrap(),
            Question::single_choice("q2", ["a", "b"], 0).unwrap(),
            Question::ordered_blanks("q3", ["ahwe"]).unwrap(),
        ])
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let session = QuizSession::start(build_quiz(Vec::new()), fixed_now());
        let summary = session.completion_summary(fixed_now());
        assert_eq!(summary.score, 0.0);
        assert_eq!(summary.total_count, 0);
        assert!(session.kind_stats().is_empty());
        assert!(session.review_items().is_empty());
    }

    #[test]
    fn elapsed_runs_to_now_until_completed() {
        let mut session = QuizSession::start(mixed(), fixed_now());
        let now = fixed_now() + Duration::seconds(40);
        assert_eq!(session.completion_summary(now).elapsed, Duration::seconds(40));

        session.complete(now);
        let later = now + Duration::minutes(10);
        assert_eq!(session.completion_summary(later).elapsed, Duration::seconds(40));
    }

    #[test]
    fn kind_without_responses_reports_zero_of_zero() {
        let mut session = QuizSession::start(mixed(), fixed_now());
        session.answer_current(Answer::Choice(1), fixed_now());
        session.go_to_question(2);
        session.answer_current(Answer::Choice(1), fixed_now());

        let stats = session.kind_stats();
        assert_eq!(stats.len(), 3);
        assert_eq!(
            stats[0],
            KindStats {
                kind: QuestionKind::SingleChoice,
                correct: 1,
                total: 2
            }
        );
        assert_eq!(stats[1].kind, QuestionKind::FreeTranslation);
        assert_eq!((stats[1].correct, stats[1].total), (0, 0));
        assert_eq!(stats[1].accuracy(), 0.0);
        assert!(!stats[1].accuracy().is_nan());
        assert_eq!(stats[2].kind, QuestionKind::OrderedBlanks);
    }

    #[test]
    fn review_covers_every_question_in_order() {
        let mut session = QuizSession::start(mixed(), fixed_now());
        session.go_to_question(1);
        session.answer_current(Answer::text(" KIFAK? "), fixed_now());
        session.go_to_question(3);
        session.answer_current(Answer::blanks(["nope"]), fixed_now());

        let items = session.review_items();
        assert_eq!(items.len(), 4);
        assert_eq!(
            items.iter().map(|i| i.position).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert!(items[0].answer.is_none());
        assert!(!items[0].is_correct);
        assert_eq!(items[1].answer, Some(&Answer::text(" KIFAK? ")));
        assert!(items[1].is_correct);
        assert!(!items[3].is_correct);
        assert_eq!(items[3].question.prompt(), "q3");
    }
}
