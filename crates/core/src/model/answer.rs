use serde::{Deserialize, Serialize};
use std::fmt;

/// A learner's submitted answer.
///
/// The shape usually matches the question it was given for, but nothing
/// enforces that: evaluating a mismatched shape is simply incorrect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// Index into a choice list. Signed so that out-of-range input from a
    /// renderer is representable and evaluates to `false`.
    Choice(i64),
    Text(String),
    Blanks(Vec<String>),
}

impl Answer {
    #[must_use]
    pub fn choice(index: i64) -> Self {
        Self::Choice(index)
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn blanks<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Blanks(values.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Choice(i) => write!(f, "#{i}"),
            Answer::Text(s) => f.write_str(s),
            Answer::Blanks(items) => f.write_str(&items.join(" / ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_json_picks_shape_from_value() {
        let choice: Answer = serde_json::from_str("2").unwrap();
        let text: Answer = serde_json::from_str("\"kifak?\"").unwrap();
        let blanks: Answer = serde_json::from_str(r#"["ahwe","ma3loum"]"#).unwrap();

        assert_eq!(choice, Answer::Choice(2));
        assert_eq!(text, Answer::text("kifak?"));
        assert_eq!(blanks, Answer::blanks(["ahwe", "ma3loum"]));
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(Answer::Choice(1).to_string(), "#1");
        assert_eq!(Answer::blanks(["a", "b"]).to_string(), "a / b");
    }
}
