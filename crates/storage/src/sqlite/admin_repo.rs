use edu_core::model::{
    Course, CourseId, CourseOverview, Game, GameLevel, Lesson, LessonId, QuizQuestion,
};
use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{conn, options_to_json, ser};
use crate::repository::{AdminRepository, StorageError};

/// Remove learner data and questions that hang off `lesson_ids_sql`, a
/// sub-select yielding lesson ids bound to `?1`.
async fn purge_lesson_data(
    tx: &mut Transaction<'_, Sqlite>,
    lesson_ids_sql: &str,
    key: &str,
) -> Result<(), StorageError> {
    for table in ["quiz_attempts", "lesson_progress", "quiz_questions"] {
        sqlx::query(&format!(
            "DELETE FROM {table} WHERE lesson_id IN ({lesson_ids_sql})"
        ))
        .bind(key)
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl AdminRepository for SqliteRepository {
    async fn list_all_courses(&self) -> Result<Vec<CourseOverview>, StorageError> {
        self.course_overviews(false).await
    }

    async fn list_all_lessons(&self, course_id: &CourseId) -> Result<Vec<Lesson>, StorageError> {
        self.lessons_of(course_id, false).await
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, description, grade_level, is_published)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(course.id.as_str())
        .bind(course.title.as_str())
        .bind(course.description.as_str())
        .bind(course.grade_level.as_str())
        .bind(course.is_published)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE courses
            SET title = ?2, description = ?3, grade_level = ?4, is_published = ?5
            WHERE id = ?1
            ",
        )
        .bind(course.id.as_str())
        .bind(course.title.as_str())
        .bind(course.description.as_str())
        .bind(course.grade_level.as_str())
        .bind(course.is_published)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_course(&self, id: &CourseId) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        purge_lesson_data(&mut tx, "SELECT id FROM lessons WHERE course_id = ?1", id.as_str())
            .await?;
        sqlx::query("DELETE FROM lessons WHERE course_id = ?1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        let res = sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(StorageError::NotFound);
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, course_id, title, video_id, lesson_order, notes, is_published)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(lesson.id.as_str())
        .bind(lesson.course_id.as_str())
        .bind(lesson.title.as_str())
        .bind(lesson.video_id.as_str())
        .bind(i64::from(lesson.order))
        .bind(lesson.notes.as_str())
        .bind(lesson.is_published)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE lessons
            SET course_id = ?2, title = ?3, video_id = ?4, lesson_order = ?5,
                notes = ?6, is_published = ?7
            WHERE id = ?1
            ",
        )
        .bind(lesson.id.as_str())
        .bind(lesson.course_id.as_str())
        .bind(lesson.title.as_str())
        .bind(lesson.video_id.as_str())
        .bind(i64::from(lesson.order))
        .bind(lesson.notes.as_str())
        .bind(lesson.is_published)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_lesson(&self, id: &LessonId) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        purge_lesson_data(&mut tx, "SELECT ?1", id.as_str()).await?;
        let res = sqlx::query("DELETE FROM lessons WHERE id = ?1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn upsert_question(&self, question: &QuizQuestion) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quiz_questions (id, lesson_id, kind, prompt, options, answer, explanation)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                lesson_id = excluded.lesson_id,
                kind = excluded.kind,
                prompt = excluded.prompt,
                options = excluded.options,
                answer = excluded.answer,
                explanation = excluded.explanation
            ",
        )
        .bind(question.id.as_str())
        .bind(question.lesson_id.as_str())
        .bind(question.kind.as_str())
        .bind(question.prompt.as_str())
        .bind(options_to_json(question.options.as_ref())?)
        .bind(question.answer.as_str())
        .bind(question.explanation.as_deref())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn upsert_game(&self, game: &Game) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO games (id, title, description, is_published)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                is_published = excluded.is_published
            ",
        )
        .bind(game.id.as_str())
        .bind(game.title.as_str())
        .bind(game.description.as_str())
        .bind(game.is_published)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn upsert_game_level(&self, level: &GameLevel) -> Result<(), StorageError> {
        let config = serde_json::to_string(&level.config).map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO game_levels (id, game_id, level_number, config)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                game_id = excluded.game_id,
                level_number = excluded.level_number,
                config = excluded.config
            ",
        )
        .bind(level.id.as_str())
        .bind(level.game_id.as_str())
        .bind(i64::from(level.level_number))
        .bind(config)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}
