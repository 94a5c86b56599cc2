#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::SessionError;

pub use sessions::{
    AttemptListItem, CompletionSummary, KindStats, NavigationView, QuizAttemptService,
    QuizLoopService, QuizSession, QuizStudy, ReviewItem, SessionSnapshot, SessionState,
    SubmitResult,
};
