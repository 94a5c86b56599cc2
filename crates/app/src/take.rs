//! Terminal front end for one quiz attempt.
//!
//! Reads one line per action. Lines starting with `:` are commands,
//! anything else answers the current question.

use std::io::{self, BufRead, Write};

use quiz_core::model::{Answer, Question, QuestionVariant};
use services::{QuizLoopService, QuizSession, SubmitResult};

/// How the learner left the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Submit,
    Quit,
}

#[derive(Debug, PartialEq)]
enum Input {
    Next,
    Previous,
    Goto(usize),
    Submit,
    Restart,
    Quit,
    Help,
    Answer(Answer),
    Invalid(String),
}

const HELP: &str = "commands: :next :prev :goto <n> :submit :restart :quit :help\n\
                    choices: type the number; blanks: separate with '|'";

/// Run the read-answer-navigate loop until the learner submits or quits.
///
/// # Errors
///
/// Returns I/O errors from `input` or `out`.
pub fn drive<R: BufRead, W: Write>(
    svc: &QuizLoopService,
    session: &mut QuizSession,
    mut input: R,
    out: &mut W,
) -> io::Result<Outcome> {
    writeln!(out, "{HELP}")?;
    show_current(out, session)?;

    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(Outcome::Quit);
        }

        let Some(question) = session.current_question() else {
            return Ok(Outcome::Submit);
        };

        match parse_input(line.trim(), question) {
            Input::Next => {
                if session.go_to_next() {
                    show_current(out, session)?;
                } else if !session.is_answered(session.current_position()) {
                    writeln!(out, "answer this question first")?;
                } else {
                    writeln!(out, "last question; use :submit when done")?;
                }
            }
            Input::Previous => {
                if session.go_to_previous() {
                    show_current(out, session)?;
                } else {
                    writeln!(out, "already at the first question")?;
                }
            }
            Input::Goto(n) => {
                if n > 0 && session.go_to_question(n - 1) {
                    show_current(out, session)?;
                } else {
                    writeln!(out, "no question {n}")?;
                }
            }
            Input::Submit => {
                if !session.is_ready_for_submission() {
                    let nav = session.navigation();
                    writeln!(out, "submitting with {} unanswered", nav.remaining())?;
                }
                return Ok(Outcome::Submit);
            }
            Input::Restart => {
                svc.restart(session);
                writeln!(out, "restarted")?;
                show_current(out, session)?;
            }
            Input::Quit => return Ok(Outcome::Quit),
            Input::Help => writeln!(out, "{HELP}")?,
            Input::Answer(answer) => {
                if let Some(record) = svc.answer_current(session, answer) {
                    let verdict = if record.is_correct { "correct" } else { "incorrect" };
                    writeln!(out, "{verdict}")?;
                    if session.go_to_next() {
                        show_current(out, session)?;
                    } else if session.is_ready_for_submission() {
                        writeln!(out, "all answered; :submit to finish")?;
                    }
                }
            }
            Input::Invalid(reason) => writeln!(out, "{reason}")?,
        }
    }
}

fn parse_input(line: &str, question: &Question) -> Input {
    if let Some(cmd) = line.strip_prefix(':') {
        let mut parts = cmd.split_whitespace();
        return match (parts.next(), parts.next()) {
            (Some("next" | "n"), None) => Input::Next,
            (Some("prev" | "p"), None) => Input::Previous,
            (Some("goto" | "g"), Some(n)) => match n.parse() {
                Ok(n) => Input::Goto(n),
                Err(_) => Input::Invalid(format!("not a question number: {n}")),
            },
            (Some("submit" | "s"), None) => Input::Submit,
            (Some("restart"), None) => Input::Restart,
            (Some("quit" | "q"), None) => Input::Quit,
            (Some("help" | "h"), None) => Input::Help,
            _ => Input::Invalid(format!("unknown command: {line}")),
        };
    }

    if line.is_empty() {
        return Input::Invalid("empty answer".into());
    }

    match question.variant() {
        QuestionVariant::SingleChoice { choices, .. } => {
            let index = match line.parse::<i64>() {
                // Choices are shown 1-based.
                Ok(n) => n.checked_sub(1),
                Err(_) => choices
                    .iter()
                    .position(|c| c.trim().eq_ignore_ascii_case(line))
                    .and_then(|i| i64::try_from(i).ok()),
            };
            index.map_or_else(
                || Input::Invalid(format!("pick a number 1-{}", choices.len())),
                |i| Input::Answer(Answer::choice(i)),
            )
        }
        QuestionVariant::FreeTranslation { .. } => Input::Answer(Answer::text(line)),
        QuestionVariant::OrderedBlanks { .. } => {
            Input::Answer(Answer::blanks(line.split('|').map(str::trim)))
        }
    }
}

fn show_current<W: Write>(out: &mut W, session: &QuizSession) -> io::Result<()> {
    let Some(question) = session.current_question() else {
        return Ok(());
    };
    let nav = session.navigation();
    writeln!(
        out,
        "\n[{}/{}] ({:.0}% answered) {}",
        nav.current_index + 1,
        nav.total,
        nav.progress * 100.0,
        question.prompt()
    )?;
    for (i, choice) in question.choices().iter().enumerate() {
        writeln!(out, "  {}. {choice}", i + 1)?;
    }
    if question.blank_count() > 0 {
        writeln!(out, "  ({} blanks)", question.blank_count())?;
    }
    if let Some(previous) = session.current_response() {
        writeln!(out, "  your answer: {}", render_answer(question, &previous.answer))?;
    }
    Ok(())
}

fn render_answer(question: &Question, answer: &Answer) -> String {
    match answer {
        Answer::Choice(i) => usize::try_from(*i)
            .ok()
            .and_then(|i| question.choices().get(i))
            .map_or_else(|| answer.to_string(), Clone::clone),
        _ => answer.to_string(),
    }
}

/// Print the completion summary, per-kind stats and review list.
///
/// # Errors
///
/// Returns I/O errors from `out`.
pub fn print_result<W: Write>(
    out: &mut W,
    session: &QuizSession,
    result: &SubmitResult,
) -> io::Result<()> {
    let summary = &result.summary;
    writeln!(
        out,
        "\nscore {}/{} ({:.1}%) in {}s, saved as attempt #{}",
        summary.correct_count,
        summary.total_count,
        summary.score * 100.0,
        summary.elapsed.num_seconds(),
        result.attempt_id
    )?;
    for stats in &result.stats {
        writeln!(
            out,
            "  {:<16} {}/{} ({:.0}%)",
            stats.kind.as_str(),
            stats.correct,
            stats.total,
            stats.accuracy() * 100.0
        )?;
    }

    writeln!(out, "\nreview:")?;
    for item in session.review_items() {
        let mark = match (item.answer, item.is_correct) {
            (None, _) => "-",
            (Some(_), true) => "+",
            (Some(_), false) => "x",
        };
        writeln!(out, " {mark} {}. {}", item.position + 1, item.question.prompt())?;
        if let Some(answer) = item.answer {
            writeln!(out, "     you: {}", render_answer(item.question, answer))?;
        }
        if !item.is_correct {
            let expected = item.question.variant().expected_answer();
            writeln!(out, "     expected: {}", render_answer(item.question, &expected))?;
        }
        if let Some(rationale) = item.question.rationale() {
            writeln!(out, "     note: {rationale}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{LessonId, Quiz, QuizId};
    use quiz_core::time::fixed_clock;
    use std::io::Cursor;
    use std::sync::Arc;
    use storage::repository::InMemoryRepository;

    fn quiz() -> Quiz {
        Quiz::new(
            QuizId::random(),
            LessonId::random(),
            vec![
                Question::single_choice("coffee?", ["shai", "ahwe"], 1).unwrap(),
                Question::free_translation("how are you?", "kifak?").unwrap(),
                Question::ordered_blanks("fill", ["ahwe", "ma3loum"]).unwrap(),
            ],
        )
    }

    fn service() -> QuizLoopService {
        let repo = InMemoryRepository::new();
        QuizLoopService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo))
    }

    #[test]
    fn parses_answers_by_question_kind() {
        let q = quiz();
        assert_eq!(
            parse_input("2", &q.questions()[0]),
            Input::Answer(Answer::choice(1))
        );
        assert_eq!(
            parse_input("AHWE", &q.questions()[0]),
            Input::Answer(Answer::choice(1))
        );
        assert_eq!(
            parse_input("ahwe | ma3loum", &q.questions()[2]),
            Input::Answer(Answer::blanks(["ahwe", "ma3loum"]))
        );
        assert_eq!(parse_input(":goto 3", &q.questions()[1]), Input::Goto(3));
        assert!(matches!(
            parse_input("tea", &q.questions()[0]),
            Input::Invalid(_)
        ));
    }

    #[test]
    fn extreme_choice_numbers_do_not_panic() {
        let q = quiz();
        let mcq = &q.questions()[0];
        assert!(matches!(
            parse_input(&i64::MIN.to_string(), mcq),
            Input::Invalid(_)
        ));
        assert_eq!(
            parse_input(&i64::MAX.to_string(), mcq),
            Input::Answer(Answer::choice(i64::MAX - 1))
        );
        assert_eq!(parse_input("0", mcq), Input::Answer(Answer::choice(-1)));
    }

    #[test]
    fn out_of_range_choice_is_graded_wrong() {
        let svc = service();
        let mut session = svc.start_with_quiz(Arc::new(quiz())).unwrap();
        let mut out = Vec::new();

        let script = format!("{}\n99\n", i64::MIN);
        drive(&svc, &mut session, Cursor::new(script), &mut out).unwrap();

        assert_eq!(session.answered_count(), 1);
        assert_eq!(session.correct_count(), 0);
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("pick a number 1-2"));
    }

    #[test]
    fn scripted_run_answers_everything_then_submits() {
        let svc = service();
        let mut session = svc.start_with_quiz(Arc::new(quiz())).unwrap();
        let script = "2\nKifak?\nahwe|wrong\n:submit\n";
        let mut out = Vec::new();

        let outcome = drive(&svc, &mut session, Cursor::new(script), &mut out).unwrap();

        assert_eq!(outcome, Outcome::Submit);
        assert_eq!(session.answered_count(), 3);
        assert_eq!(session.correct_count(), 2);
    }

    #[test]
    fn next_without_answer_stays_put_and_eof_quits() {
        let svc = service();
        let mut session = svc.start_with_quiz(Arc::new(quiz())).unwrap();
        let mut out = Vec::new();

        let outcome = drive(&svc, &mut session, Cursor::new(":next\n"), &mut out).unwrap();

        assert_eq!(outcome, Outcome::Quit);
        assert_eq!(session.current_position(), 0);
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("answer this question first"));
    }
}
