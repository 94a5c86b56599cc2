use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::ids::{LessonId, ParseIdError, QuizId};
use crate::model::question::{Question, QuestionDraft, QuestionError, QuestionKind};

/// A quiz needs at least this many questions to be offered for study.
pub const MIN_QUESTIONS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("invalid quiz id: {0}")]
    InvalidQuizId(ParseIdError),

    #[error("invalid lesson id: {0}")]
    InvalidLessonId(ParseIdError),

    #[error("question {index}: {source}")]
    Question {
        index: usize,
        #[source]
        source: QuestionError,
    },

    #[error("quiz has {found} questions, at least {min} are required")]
    TooFewQuestions { found: usize, min: usize },
}

/// Immutable, ordered set of questions generated for a lesson.
///
/// Question order is both display order and navigation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuizDraft", into = "QuizDraft")]
pub struct Quiz {
    id: QuizId,
    lesson_id: LessonId,
    questions: Vec<Question>,
    meta: Map<String, Value>,
}

impl Quiz {
    /// Assemble a quiz from validated questions.
    ///
    /// Size is not checked here; use [`Quiz::ensure_valid`] where a quiz is
    /// accepted for study.
    #[must_use]
    pub fn new(id: QuizId, lesson_id: LessonId, questions: Vec<Question>) -> Self {
        Self {
            id,
            lesson_id,
            questions,
            meta: Map::new(),
        }
    }

    #[must_use]
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, position: usize) -> Option<&Question> {
        self.questions.get(position)
    }

    #[must_use]
    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.questions.len() >= MIN_QUESTIONS
    }

    /// # Errors
    ///
    /// Returns `QuizError::TooFewQuestions` below [`MIN_QUESTIONS`].
    pub fn ensure_valid(&self) -> Result<(), QuizError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(QuizError::TooFewQuestions {
                found: self.questions.len(),
                min: MIN_QUESTIONS,
            })
        }
    }

    /// Distinct question kinds in order of first appearance.
    #[must_use]
    pub fn kinds(&self) -> Vec<QuestionKind> {
        let mut kinds = Vec::new();
        for q in &self.questions {
            let kind = q.kind();
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }
}

/// Quiz payload as produced by the quiz generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub quiz_id: String,
    pub lesson_id: String,
    pub questions: Vec<QuestionDraft>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl QuizDraft {
    /// Parse ids and validate every question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidQuizId`/`InvalidLessonId` for malformed
    /// ids and `QuizError::Question` naming the first rejected question.
    pub fn validate(self) -> Result<Quiz, QuizError> {
        let id: QuizId = self.quiz_id.parse().map_err(QuizError::InvalidQuizId)?;
        let lesson_id: LessonId = self.lesson_id.parse().map_err(QuizError::InvalidLessonId)?;

        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                draft
                    .validate()
                    .map_err(|source| QuizError::Question { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Quiz::new(id, lesson_id, questions).with_meta(self.meta))
    }
}

impl TryFrom<QuizDraft> for Quiz {
    type Error = QuizError;

    fn try_from(draft: QuizDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<Quiz> for QuizDraft {
    fn from(quiz: Quiz) -> Self {
        Self {
            quiz_id: quiz.id.to_string(),
            lesson_id: quiz.lesson_id.to_string(),
            questions: quiz.questions.into_iter().map(QuestionDraft::from).collect(),
            meta: quiz.meta,
        }
    }
}
