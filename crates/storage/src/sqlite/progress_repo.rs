use chrono::{DateTime, NaiveDate, Utc};
use edu_core::LocalCalendar;
use edu_core::model::{
    ContinueWatchingItem, CourseId, LessonId, LessonProgress, UserId, WatchPercent,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, i64_to_u32, map_progress_row, offset_modifier, parse_day, ser};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(&self, record: &LessonProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_progress (user_id, lesson_id, watch_percent, completed_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                watch_percent = excluded.watch_percent,
                completed_at = excluded.completed_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(record.user_id.as_str())
        .bind(record.lesson_id.as_str())
        .bind(i64::from(record.watch_percent.value()))
        .bind(record.completed_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, lesson_id, watch_percent, completed_at, updated_at
            FROM lesson_progress
            WHERE user_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(user_id.as_str())
        .bind(lesson_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_progress_row).transpose()
    }

    async fn latest_in_progress(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ContinueWatchingItem>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT p.lesson_id, p.watch_percent, l.title AS lesson_title,
                   c.id AS course_id, c.title AS course_title
            FROM lesson_progress p
            JOIN lessons l ON l.id = p.lesson_id
            JOIN courses c ON c.id = l.course_id
            WHERE p.user_id = ?1
              AND (p.completed_at IS NULL OR p.watch_percent < 100)
            ORDER BY julianday(p.updated_at) DESC
            LIMIT 1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let percent = i64_to_u32("watch_percent", row.try_get("watch_percent").map_err(ser)?)?;
        let percent = WatchPercent::from_u8(u8::try_from(percent).map_err(ser)?).map_err(ser)?;
        Ok(Some(ContinueWatchingItem::new(
            LessonId::new(row.try_get::<String, _>("lesson_id").map_err(ser)?),
            CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?),
            row.try_get("lesson_title").map_err(ser)?,
            row.try_get("course_title").map_err(ser)?,
            percent,
        )))
    }

    async fn count_completed(
        &self,
        user_id: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS n
            FROM lesson_progress
            WHERE user_id = ?1
              AND completed_at IS NOT NULL
              AND (?2 IS NULL OR julianday(completed_at) >= julianday(?2))
            ",
        )
        .bind(user_id.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;
        i64_to_u32("count", row.try_get("n").map_err(ser)?)
    }

    async fn completion_dates(
        &self,
        user_id: &UserId,
        calendar: LocalCalendar,
    ) -> Result<Vec<NaiveDate>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT DISTINCT date(completed_at, ?2) AS day
            FROM lesson_progress
            WHERE user_id = ?1 AND completed_at IS NOT NULL
            ORDER BY day DESC
            ",
        )
        .bind(user_id.as_str())
        .bind(offset_modifier(calendar.offset_minutes()))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| parse_day(&row.try_get::<String, _>("day").map_err(ser)?))
            .collect()
    }
}
