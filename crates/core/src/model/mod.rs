mod answer;
mod attempt;
mod ids;
mod question;
mod quiz;
mod response;

pub use answer::Answer;
pub use attempt::{AttemptError, KindTallies, KindTally, QuizAttempt};
pub use ids::{LessonId, ParseIdError, QuizId};
pub use question::{Question, QuestionDraft, QuestionError, QuestionKind, QuestionVariant};
pub use quiz::{MIN_QUESTIONS, Quiz, QuizDraft, QuizError};
pub use response::ResponseRecord;
