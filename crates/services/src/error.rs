//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AttemptError, QuizError};
use storage::repository::StorageError;

/// Errors emitted by session services.
///
/// State-machine transitions never fail; these cover accepting a quiz,
/// restoring a snapshot, and handing results off to storage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("quiz cannot be studied: {0}")]
    InvalidQuiz(#[from] QuizError),
    #[error("session has not been completed")]
    NotCompleted,
    #[error("only {answered} of {total} questions answered")]
    NotReady { answered: usize, total: usize },
    #[error("snapshot response at position {position} is outside a quiz of {len} questions")]
    SnapshotPosition { position: usize, len: usize },
    #[error("snapshot holds more than one response for position {position}")]
    SnapshotDuplicate { position: usize },
    #[error("snapshot cursor {current} is outside a quiz of {len} questions")]
    SnapshotCursor { current: usize, len: usize },
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
