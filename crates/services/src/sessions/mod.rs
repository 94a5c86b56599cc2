mod progress;
mod service;
mod snapshot;
mod study;
mod summary;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::NavigationView;
pub use service::{QuizSession, SessionState};
pub use snapshot::SessionSnapshot;
pub use study::QuizStudy;
pub use summary::{CompletionSummary, KindStats, ReviewItem};
pub use view::{AttemptListItem, QuizAttemptService};
pub use workflow::{QuizLoopService, SubmitResult};
