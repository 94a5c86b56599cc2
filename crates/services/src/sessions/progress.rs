use serde::Serialize;

use super::service::QuizSession;

/// Where the learner is and where they may go, for navigation controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationView {
    pub current_index: usize,
    pub total: usize,
    /// `answered / total`, `0.0` for an empty quiz.
    pub progress: f64,
    /// Positions with a response, ascending.
    pub answered_positions: Vec<usize>,
    pub can_go_next: bool,
    pub can_go_previous: bool,
}

impl NavigationView {
    #[must_use]
    pub fn of(session: &QuizSession) -> Self {
        let total = session.total_questions();
        let answered_positions: Vec<usize> = session.responses().map(|r| r.position).collect();
        Self {
            current_index: session.current_position(),
            total,
            progress: ratio(answered_positions.len(), total),
            answered_positions,
            can_go_next: session.can_go_next(),
            can_go_previous: session.can_go_previous(),
        }
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.answered_positions.len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.answered())
    }
}

/// `part / whole`, or `0.0` when `whole` is zero.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
