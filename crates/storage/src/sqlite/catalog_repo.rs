use edu_core::model::{
    Course, CourseId, CourseOverview, Game, GameId, GameLevel, GameLevelId, GameOverview, Lesson,
    LessonId, QuizQuestion,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, i64_to_u32, map_course_row, map_game_row, map_lesson_row, map_level_row,
    map_question_row, ser,
};
use crate::repository::{CatalogRepository, StorageError};

const COURSE_COLUMNS: &str = "id, title, description, grade_level, is_published";
const LESSON_COLUMNS: &str =
    "id, course_id, title, video_id, lesson_order, notes, is_published";

impl SqliteRepository {
    /// Courses ordered by title, each with the ids of its lessons in order.
    pub(super) async fn course_overviews(
        &self,
        published_only: bool,
    ) -> Result<Vec<CourseOverview>, StorageError> {
        let courses = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE (?1 = 0 OR is_published = 1) ORDER BY title ASC"
        ))
        .bind(published_only)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(courses.len());
        for row in courses {
            let course = map_course_row(&row)?;
            let lesson_rows = sqlx::query(
                r"
                SELECT id FROM lessons
                WHERE course_id = ?1 AND (?2 = 0 OR is_published = 1)
                ORDER BY lesson_order ASC
                ",
            )
            .bind(course.id.as_str())
            .bind(published_only)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
            let ids = lesson_rows
                .iter()
                .map(|r| r.try_get::<String, _>("id").map(LessonId::new).map_err(ser))
                .collect::<Result<Vec<_>, _>>()?;
            out.push(CourseOverview::new(course, &ids));
        }
        Ok(out)
    }

    pub(super) async fn lessons_of(
        &self,
        course_id: &CourseId,
        published_only: bool,
    ) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {LESSON_COLUMNS} FROM lessons
            WHERE course_id = ?1 AND (?2 = 0 OR is_published = 1)
            ORDER BY lesson_order ASC
            "
        ))
        .bind(course_id.as_str())
        .bind(published_only)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_lesson_row).collect()
    }
}

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn list_published_courses(&self) -> Result<Vec<CourseOverview>, StorageError> {
        self.course_overviews(true).await
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_course_row).transpose()
    }

    async fn list_published_lessons(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<Lesson>, StorageError> {
        self.lessons_of(course_id, true).await
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(&format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ?1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn list_questions(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Vec<QuizQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, kind, prompt, options, answer, explanation
            FROM quiz_questions
            WHERE lesson_id = ?1
            ORDER BY rowid ASC
            ",
        )
        .bind(lesson_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_question_row).collect()
    }

    async fn list_published_games(&self) -> Result<Vec<GameOverview>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT g.id, g.title, g.description, COUNT(l.id) AS level_count
            FROM games g
            LEFT JOIN game_levels l ON l.game_id = g.id
            WHERE g.is_published = 1
            GROUP BY g.id
            ORDER BY g.title ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                Ok(GameOverview {
                    id: GameId::new(row.try_get::<String, _>("id").map_err(ser)?),
                    title: row.try_get("title").map_err(ser)?,
                    description: row.try_get("description").map_err(ser)?,
                    level_count: i64_to_u32(
                        "level_count",
                        row.try_get("level_count").map_err(ser)?,
                    )?,
                })
            })
            .collect()
    }

    async fn get_game(&self, id: &GameId) -> Result<Option<Game>, StorageError> {
        let row = sqlx::query("SELECT id, title, description, is_published FROM games WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_game_row).transpose()
    }

    async fn list_game_levels(&self, game_id: &GameId) -> Result<Vec<GameLevel>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, game_id, level_number, config
            FROM game_levels
            WHERE game_id = ?1
            ORDER BY level_number ASC
            ",
        )
        .bind(game_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_level_row).collect()
    }

    async fn get_game_level(&self, id: &GameLevelId) -> Result<Option<GameLevel>, StorageError> {
        let row =
            sqlx::query("SELECT id, game_id, level_number, config FROM game_levels WHERE id = ?1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(conn)?;
        row.as_ref().map(map_level_row).transpose()
    }
}
