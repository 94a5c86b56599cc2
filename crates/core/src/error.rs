use thiserror::Error;

use crate::model::{AttemptError, ParseIdError, QuestionError, QuizError};

/// Crate-level error for callers that do not care which model rejected input.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
