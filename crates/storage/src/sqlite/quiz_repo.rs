use chrono::Utc;
use quiz_core::model::{LessonId, Quiz, QuizId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, count_to_i64, quiz_id_from_str, ser};
use crate::repository::{QuizRepository, StorageError};

fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let body: String = row.try_get("body").map_err(ser)?;
    let quiz: Quiz = serde_json::from_str(&body).map_err(ser)?;
    if quiz.id() != quiz_id_from_str(&id)? {
        return Err(StorageError::Serialization(format!(
            "quiz body id {} does not match row id {id}",
            quiz.id()
        )));
    }
    Ok(quiz)
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let body = serde_json::to_string(quiz).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO quizzes (id, lesson_id, body, question_count, stored_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    lesson_id = excluded.lesson_id,
                    body = excluded.body,
                    question_count = excluded.question_count,
                    stored_at = excluded.stored_at
            ",
        )
        .bind(quiz.id().to_string())
        .bind(quiz.lesson_id().to_string())
        .bind(body)
        .bind(count_to_i64("question_count", quiz.len())?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let row = sqlx::query("SELECT id, body FROM quizzes WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_quiz_row(&row)
    }

    async fn list_quizzes_for_lesson(&self, lesson_id: LessonId) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query("SELECT id, body FROM quizzes WHERE lesson_id = ?1 ORDER BY id ASC")
            .bind(lesson_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_quiz_row).collect()
    }
}
