use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quiz_core::model::{Quiz, QuizId};
use services::{Clock, QuizAttemptService, QuizLoopService, QuizSession};
use storage::repository::{QuizRepository, Storage};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod take;

const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidLimit { raw: String },
    MissingQuizId,
    MissingFile,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::MissingQuizId => write!(f, "--quiz-id (or QUIZ_ID) is required"),
            ArgsError::MissingFile => write!(f, "--file is required"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- import  --file <quiz.json> [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- take    (--quiz-id <uuid> | --file <quiz.json>) [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- history [--quiz-id <uuid>] [--limit <n>] [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --limit {DEFAULT_HISTORY_LIMIT}");
    eprintln!();
    eprintln!("Environment (also read from .env):");
    eprintln!("  QUIZ_DB_URL, QUIZ_ID, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Import,
    Take,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "import" => Some(Self::Import),
            "take" => Some(Self::Take),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    quiz_id: Option<QuizId>,
    file: Option<PathBuf>,
    limit: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut quiz_id = std::env::var("QUIZ_ID")
            .ok()
            .and_then(|value| value.parse::<QuizId>().ok());
        let mut file = None;
        let mut limit = DEFAULT_HISTORY_LIMIT;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--quiz-id" => {
                    let value = require_value(args, "--quiz-id")?;
                    let parsed = value
                        .parse::<QuizId>()
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                    quiz_id = Some(parsed);
                }
                "--file" => {
                    file = Some(PathBuf::from(require_value(args, "--file")?));
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or(ArgsError::InvalidLimit { raw: value })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            quiz_id,
            file,
            limit,
        })
    }

    fn check_for(&self, cmd: Command) -> Result<(), ArgsError> {
        match cmd {
            Command::Import if self.file.is_none() => Err(ArgsError::MissingFile),
            Command::Take if self.file.is_none() && self.quiz_id.is_none() => {
                Err(ArgsError::MissingQuizId)
            }
            Command::History if self.quiz_id.is_none() => Err(ArgsError::MissingQuizId),
            _ => Ok(()),
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn load_quiz_file(path: &Path) -> Result<Quiz, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let quiz: Quiz = serde_json::from_str(&raw)?;
    Ok(quiz)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut iter = argv.into_iter().skip(1);
    let parsed = Args::parse(&mut iter)
        .and_then(|args| args.check_for(cmd).map(|()| args))
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    info!(db = %parsed.db_url, ?cmd, "storage ready");

    match cmd {
        Command::Import => {
            let path = parsed.file.as_deref().ok_or(ArgsError::MissingFile)?;
            let quiz = load_quiz_file(path)?;
            storage.quizzes.upsert_quiz(&quiz).await?;
            println!(
                "imported quiz {} ({} questions, lesson {})",
                quiz.id(),
                quiz.len(),
                quiz.lesson_id()
            );
            Ok(())
        }
        Command::Take => {
            let clock = Clock::system();
            let loop_svc = QuizLoopService::new(
                clock,
                Arc::clone(&storage.quizzes),
                Arc::clone(&storage.attempts),
            );

            // A quiz file is stored first so its attempt has a parent row.
            let mut session: QuizSession = match parsed.file.as_deref() {
                Some(path) => {
                    let quiz = load_quiz_file(path)?;
                    storage.quizzes.upsert_quiz(&quiz).await?;
                    loop_svc.start_with_quiz(Arc::new(quiz))?
                }
                None => {
                    let quiz_id = parsed.quiz_id.ok_or(ArgsError::MissingQuizId)?;
                    loop_svc.start_session(quiz_id).await?
                }
            };

            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            match take::drive(&loop_svc, &mut session, stdin.lock(), &mut stdout)? {
                take::Outcome::Submit => {
                    let result = loop_svc.submit(&mut session).await?;
                    take::print_result(&mut stdout, &session, &result)?;
                }
                take::Outcome::Quit => println!("quit without saving"),
            }
            Ok(())
        }
        Command::History => {
            let quiz_id = parsed.quiz_id.ok_or(ArgsError::MissingQuizId)?;
            let history = QuizAttemptService::new(Arc::clone(&storage.attempts));
            let items = history.list_recent_attempts(quiz_id, parsed.limit).await?;
            if items.is_empty() {
                println!("no attempts for quiz {quiz_id}");
                return Ok(());
            }
            for item in &items {
                println!(
                    "#{:<4} {}  {}/{}  {:>5.1}%  {}s",
                    item.id,
                    item.completed_at.format("%Y-%m-%d %H:%M"),
                    item.correct,
                    item.total,
                    item.score * 100.0,
                    item.time_taken_seconds
                );
            }
            if let Some(best) = history.best_score(quiz_id, parsed.limit).await? {
                println!("best: {:.1}%", best * 100.0);
            }
            Ok(())
        }
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn parses_flags() {
        let id = "550e8400-e29b-41d4-a716-446655440001";
        let args = parse(&["--db", "sqlite::memory:", "--quiz-id", id, "--limit", "5"]).unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.quiz_id.map(|q| q.to_string()).as_deref(), Some(id));
        assert_eq!(args.limit, 5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse(&["--quiz-id", "nope"]),
            Err(ArgsError::InvalidQuizId { .. })
        ));
        assert!(matches!(
            parse(&["--limit", "0"]),
            Err(ArgsError::InvalidLimit { .. })
        ));
        assert!(matches!(
            parse(&["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(parse(&["--bogus"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn import_needs_a_file() {
        let args = parse(&["--db", "sqlite::memory:"]).unwrap();
        assert!(matches!(
            args.check_for(Command::Import),
            Err(ArgsError::MissingFile)
        ));
    }

    #[test]
    fn normalizes_relative_paths() {
        let url = normalize_sqlite_url("sqlite:data/quiz.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/quiz.db"));
        assert_eq!(
            normalize_sqlite_url("sqlite://already".into()),
            "sqlite://already"
        );
    }
}
