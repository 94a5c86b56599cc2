use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::answer::Answer;

/// Minimum number of options a single-choice question must offer.
pub const MIN_CHOICES: usize = 2;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Construction-time faults for a question.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text must not be empty")]
    EmptyPrompt,

    #[error("unknown question type: {0:?}")]
    UnknownKind(String),

    #[error("{kind} answer must be {expected}")]
    AnswerShape {
        kind: QuestionKind,
        expected: &'static str,
    },

    #[error("single choice question needs at least {min} choices, found {found}")]
    TooFewChoices { found: usize, min: usize },

    #[error("choice {index} is empty")]
    EmptyChoice { index: usize },

    #[error("correct choice {index} is out of range for {len} choices")]
    ChoiceOutOfRange { index: usize, len: usize },

    #[error("correct answer must not be empty")]
    EmptyAnswer,

    #[error("ordered blanks question has no blanks")]
    NoBlanks,

    #[error("blank {index} is empty")]
    EmptyBlank { index: usize },
}

//
// ─── KIND ─────────────────────────────────────────────────────────────────────
//

/// Tag of a question variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    FreeTranslation,
    OrderedBlanks,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 3] = [
        QuestionKind::SingleChoice,
        QuestionKind::FreeTranslation,
        QuestionKind::OrderedBlanks,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::FreeTranslation => "free_translation",
            QuestionKind::OrderedBlanks => "ordered_blanks",
        }
    }

    /// Tag used by the quiz generator's JSON payloads.
    #[must_use]
    pub fn wire_tag(self) -> &'static str {
        match self {
            QuestionKind::SingleChoice => "mcq",
            QuestionKind::FreeTranslation => "translate",
            QuestionKind::OrderedBlanks => "fill_blank",
        }
    }

    #[must_use]
    pub fn from_wire_tag(tag: &str) -> Option<Self> {
        match tag {
            "mcq" => Some(Self::SingleChoice),
            "translate" => Some(Self::FreeTranslation),
            "fill_blank" => Some(Self::OrderedBlanks),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── VARIANT ──────────────────────────────────────────────────────────────────
//

/// Answer shape of a question together with its correct answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionVariant {
    SingleChoice {
        choices: Vec<String>,
        correct_index: usize,
    },
    FreeTranslation {
        correct: String,
    },
    OrderedBlanks {
        correct: Vec<String>,
    },
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn same_text(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

impl QuestionVariant {
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionVariant::SingleChoice { .. } => QuestionKind::SingleChoice,
            QuestionVariant::FreeTranslation { .. } => QuestionKind::FreeTranslation,
            QuestionVariant::OrderedBlanks { .. } => QuestionKind::OrderedBlanks,
        }
    }

    /// Evaluates a submitted answer.
    ///
    /// Total over every input: a shape that does not fit the variant, an
    /// out-of-range index or a wrong blank count is `false`, never an error.
    #[must_use]
    pub fn is_correct(&self, answer: &Answer) -> bool {
        match (self, answer) {
            (QuestionVariant::SingleChoice { correct_index, .. }, Answer::Choice(given)) => {
                usize::try_from(*given).is_ok_and(|given| given == *correct_index)
            }
            (QuestionVariant::FreeTranslation { correct }, Answer::Text(given)) => {
                same_text(given, correct)
            }
            (QuestionVariant::OrderedBlanks { correct }, Answer::Blanks(given)) => {
                given.len() == correct.len()
                    && given.iter().zip(correct).all(|(g, c)| same_text(g, c))
            }
            _ => false,
        }
    }

    /// The correct answer expressed as a submittable value.
    #[must_use]
    pub fn expected_answer(&self) -> Answer {
        match self {
            QuestionVariant::SingleChoice { correct_index, .. } => {
                Answer::Choice(i64::try_from(*correct_index).unwrap_or(i64::MAX))
            }
            QuestionVariant::FreeTranslation { correct } => Answer::Text(correct.clone()),
            QuestionVariant::OrderedBlanks { correct } => Answer::Blanks(correct.clone()),
        }
    }

    fn validate(&self) -> Result<(), QuestionError> {
        match self {
            QuestionVariant::SingleChoice {
                choices,
                correct_index,
            } => {
                if choices.len() < MIN_CHOICES {
                    return Err(QuestionError::TooFewChoices {
                        found: choices.len(),
                        min: MIN_CHOICES,
                    });
                }
                if let Some(index) = choices.iter().position(|c| c.trim().is_empty()) {
                    return Err(QuestionError::EmptyChoice { index });
                }
                if *correct_index >= choices.len() {
                    return Err(QuestionError::ChoiceOutOfRange {
                        index: *correct_index,
                        len: choices.len(),
                    });
                }
            }
            QuestionVariant::FreeTranslation { correct } => {
                if correct.trim().is_empty() {
                    return Err(QuestionError::EmptyAnswer);
                }
            }
            QuestionVariant::OrderedBlanks { correct } => {
                if correct.is_empty() {
                    return Err(QuestionError::NoBlanks);
                }
                if let Some(index) = correct.iter().position(|c| c.trim().is_empty()) {
                    return Err(QuestionError::EmptyBlank { index });
                }
            }
        }
        Ok(())
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A validated quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft", into = "QuestionDraft")]
pub struct Question {
    prompt: String,
    variant: QuestionVariant,
    rationale: Option<String>,
}

impl Question {
    /// Build a question from an already-shaped variant.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank or the variant's
    /// correct answer is unusable (too few choices, index out of range,
    /// empty text or blanks).
    pub fn new(prompt: impl Into<String>, variant: QuestionVariant) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        variant.validate()?;
        Ok(Self {
            prompt,
            variant,
            rationale: None,
        })
    }

    /// # Errors
    ///
    /// See [`Question::new`].
    pub fn single_choice<I, S>(
        prompt: impl Into<String>,
        choices: I,
        correct_index: usize,
    ) -> Result<Self, QuestionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            prompt,
            QuestionVariant::SingleChoice {
                choices: choices.into_iter().map(Into::into).collect(),
                correct_index,
            },
        )
    }

    /// # Errors
    ///
    /// See [`Question::new`].
    pub fn free_translation(
        prompt: impl Into<String>,
        correct: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        Self::new(
            prompt,
            QuestionVariant::FreeTranslation {
                correct: correct.into(),
            },
        )
    }

    /// # Errors
    ///
    /// See [`Question::new`].
    pub fn ordered_blanks<I, S>(prompt: impl Into<String>, correct: I) -> Result<Self, QuestionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            prompt,
            QuestionVariant::OrderedBlanks {
                correct: correct.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Attach an explanation shown after answering. Blank text clears it.
    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        let rationale = rationale.into();
        self.rationale = (!rationale.trim().is_empty()).then_some(rationale);
        self
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn variant(&self) -> &QuestionVariant {
        &self.variant
    }

    #[must_use]
    pub fn rationale(&self) -> Option<&str> {
        self.rationale.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.variant.kind()
    }

    /// Choice labels for single-choice questions, empty otherwise.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        match &self.variant {
            QuestionVariant::SingleChoice { choices, .. } => choices,
            _ => &[],
        }
    }

    /// Number of inputs an ordered-blanks renderer must show.
    #[must_use]
    pub fn blank_count(&self) -> usize {
        match &self.variant {
            QuestionVariant::OrderedBlanks { correct } => correct.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_correct(&self, answer: &Answer) -> bool {
        self.variant.is_correct(answer)
    }
}

//
// ─── WIRE SHAPE ───────────────────────────────────────────────────────────────
//

/// Loosely-typed question as delivered by the quiz generator.
///
/// `validate` is the only way from this shape to a [`Question`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "question")]
    pub prompt: String,
    pub answer: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl QuestionDraft {
    /// Check the answer shape against the tag and build a [`Question`].
    ///
    /// A single-choice answer given as the text of one of the choices is
    /// normalized to that choice's index.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownKind` for an unrecognized tag,
    /// `QuestionError::AnswerShape` when the answer does not fit the tag,
    /// and any error from [`Question::new`].
    pub fn validate(self) -> Result<Question, QuestionError> {
        let kind = QuestionKind::from_wire_tag(self.kind.trim())
            .ok_or_else(|| QuestionError::UnknownKind(self.kind.clone()))?;

        let variant = match kind {
            QuestionKind::SingleChoice => {
                let choices = self.choices.unwrap_or_default();
                let correct_index = single_choice_index(&self.answer, &choices)?;
                QuestionVariant::SingleChoice {
                    choices,
                    correct_index,
                }
            }
            QuestionKind::FreeTranslation => match self.answer {
                Value::String(correct) => QuestionVariant::FreeTranslation { correct },
                _ => {
                    return Err(QuestionError::AnswerShape {
                        kind,
                        expected: "a string",
                    });
                }
            },
            QuestionKind::OrderedBlanks => {
                let correct = string_list(self.answer).ok_or(QuestionError::AnswerShape {
                    kind,
                    expected: "a list of strings",
                })?;
                QuestionVariant::OrderedBlanks { correct }
            }
        };

        let question = Question::new(self.prompt, variant)?;
        Ok(match self.rationale {
            Some(r) => question.with_rationale(r),
            None => question,
        })
    }
}

fn single_choice_index(answer: &Value, choices: &[String]) -> Result<usize, QuestionError> {
    let shape = QuestionError::AnswerShape {
        kind: QuestionKind::SingleChoice,
        expected: "a non-negative choice index",
    };
    match answer {
        Value::Number(n) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or(shape),
        Value::String(text) => choices
            .iter()
            .position(|c| same_text(c, text))
            .ok_or(shape),
        _ => Err(shape),
    }
}

fn string_list(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

impl From<Question> for QuestionDraft {
    fn from(question: Question) -> Self {
        let kind = question.kind().wire_tag().to_owned();
        let (answer, choices) = match question.variant {
            QuestionVariant::SingleChoice {
                choices,
                correct_index,
            } => (Value::from(correct_index), Some(choices)),
            QuestionVariant::FreeTranslation { correct } => (Value::String(correct), None),
            QuestionVariant::OrderedBlanks { correct } => (Value::from(correct), None),
        };
        Self {
            kind,
            prompt: question.prompt,
            answer,
            choices,
            rationale: question.rationale,
        }
    }
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
