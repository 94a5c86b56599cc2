use quiz_core::model::{KindTallies, KindTally, QuizAttempt, QuizId, ResponseRecord};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, lesson_id_from_str, quiz_id_from_str, ser, u32_from_i64};
use crate::repository::{AttemptId, AttemptRepository, AttemptRow, StorageError};

const ATTEMPT_COLUMNS: &str = r"
    id, quiz_id, lesson_id, started_at, completed_at,
    total_questions, correct_answers,
    single_choice_correct, single_choice_total,
    free_translation_correct, free_translation_total,
    ordered_blanks_correct, ordered_blanks_total,
    responses
";

fn tally(row: &SqliteRow, correct: &'static str, total: &'static str) -> Result<KindTally, StorageError> {
    Ok(KindTally::new(
        u32_from_i64(correct, row.try_get::<i64, _>(correct).map_err(ser)?)?,
        u32_from_i64(total, row.try_get::<i64, _>(total).map_err(ser)?)?,
    ))
}

fn map_attempt_row(row: &SqliteRow) -> Result<AttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let quiz_id = quiz_id_from_str(&row.try_get::<String, _>("quiz_id").map_err(ser)?)?;
    let lesson_id = lesson_id_from_str(&row.try_get::<String, _>("lesson_id").map_err(ser)?)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let total_questions = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let correct_answers = u32_from_i64(
        "correct_answers",
        row.try_get::<i64, _>("correct_answers").map_err(ser)?,
    )?;
    let tallies = KindTallies {
        single_choice: tally(row, "single_choice_correct", "single_choice_total")?,
        free_translation: tally(row, "free_translation_correct", "free_translation_total")?,
        ordered_blanks: tally(row, "ordered_blanks_correct", "ordered_blanks_total")?,
    };
    let responses: Vec<ResponseRecord> =
        serde_json::from_str(&row.try_get::<String, _>("responses").map_err(ser)?).map_err(ser)?;

    let attempt = QuizAttempt::from_persisted(
        quiz_id,
        lesson_id,
        started_at,
        completed_at,
        total_questions,
        correct_answers,
        tallies,
        responses,
    )
    .map_err(ser)?;

    Ok(AttemptRow::new(id, attempt))
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<AttemptId, StorageError> {
        let tallies = attempt.tallies();
        let responses = serde_json::to_string(attempt.responses()).map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO quiz_attempts (
                    quiz_id, lesson_id, started_at, completed_at,
                    total_questions, correct_answers,
                    single_choice_correct, single_choice_total,
                    free_translation_correct, free_translation_total,
                    ordered_blanks_correct, ordered_blanks_total,
                    responses
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
        )
        .bind(attempt.quiz_id().to_string())
        .bind(attempt.lesson_id().to_string())
        .bind(attempt.started_at())
        .bind(attempt.completed_at())
        .bind(i64::from(attempt.total_questions()))
        .bind(i64::from(attempt.correct_answers()))
        .bind(i64::from(tallies.single_choice.correct))
        .bind(i64::from(tallies.single_choice.total))
        .bind(i64::from(tallies.free_translation.correct))
        .bind(i64::from(tallies.free_translation.total))
        .bind(i64::from(tallies.ordered_blanks.correct))
        .bind(i64::from(tallies.ordered_blanks.total))
        .bind(responses)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<QuizAttempt, StorageError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row).map(|r| r.attempt)
    }

    async fn list_attempt_rows(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts
             WHERE quiz_id = ?1
             ORDER BY completed_at DESC, id DESC
             LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(quiz_id.to_string())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }
}
