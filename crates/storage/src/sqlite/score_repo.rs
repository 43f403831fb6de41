use chrono::{DateTime, Utc};
use edu_core::model::{GameAttempt, GameId, GameLevelId, LessonId, QuizAttempt, UserId};
use edu_core::scoring::BestRecord;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, i64_to_u32, i64_to_u64, ser, u64_to_i64};
use crate::repository::{GameScoreRepository, QuizAttemptRepository, StorageError};

fn map_best_row(row: &SqliteRow) -> Result<BestRecord, StorageError> {
    Ok(BestRecord::new(
        i64_to_u32("best_score", row.try_get("best_score").map_err(ser)?)?,
        i64_to_u64("best_time_ms", row.try_get("best_time_ms").map_err(ser)?)?,
    ))
}

#[async_trait::async_trait]
impl QuizAttemptRepository for SqliteRepository {
    async fn record_quiz_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quiz_attempts (user_id, lesson_id, score, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(attempt.user_id.as_str())
        .bind(attempt.lesson_id.as_str())
        .bind(i64::from(attempt.score))
        .bind(attempt.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_quiz_attempts(&self, user_id: &UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, lesson_id, score, created_at
            FROM quiz_attempts
            WHERE user_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                Ok(QuizAttempt {
                    user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
                    lesson_id: LessonId::new(row.try_get::<String, _>("lesson_id").map_err(ser)?),
                    score: i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
                    created_at: row.try_get("created_at").map_err(ser)?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl GameScoreRepository for SqliteRepository {
    async fn record_game_attempt(&self, attempt: &GameAttempt) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO game_attempts (user_id, game_level_id, score, time_ms, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(attempt.user_id.as_str())
        .bind(attempt.level_id.as_str())
        .bind(i64::from(attempt.score))
        .bind(u64_to_i64("time_ms", attempt.time_ms)?)
        .bind(attempt.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_game_attempts(&self, user_id: &UserId) -> Result<Vec<GameAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, game_level_id, score, time_ms, created_at
            FROM game_attempts
            WHERE user_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                Ok(GameAttempt {
                    user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
                    level_id: GameLevelId::new(
                        row.try_get::<String, _>("game_level_id").map_err(ser)?,
                    ),
                    score: i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
                    time_ms: i64_to_u64("time_ms", row.try_get("time_ms").map_err(ser)?)?,
                    created_at: row.try_get("created_at").map_err(ser)?,
                })
            })
            .collect()
    }

    async fn get_best(
        &self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> Result<Option<BestRecord>, StorageError> {
        let row = sqlx::query(
            "SELECT best_score, best_time_ms FROM game_bests WHERE user_id = ?1 AND game_id = ?2",
        )
        .bind(user_id.as_str())
        .bind(game_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;
        row.as_ref().map(map_best_row).transpose()
    }

    async fn offer_best(
        &self,
        user_id: &UserId,
        game_id: &GameId,
        candidate: BestRecord,
        at: DateTime<Utc>,
    ) -> Result<(BestRecord, bool), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        // The replacement rule lives in the conflict clause so concurrent
        // offers never overwrite a better record.
        let res = sqlx::query(
            r"
            INSERT INTO game_bests (user_id, game_id, best_score, best_time_ms, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, game_id) DO UPDATE SET
                best_score = excluded.best_score,
                best_time_ms = excluded.best_time_ms,
                updated_at = excluded.updated_at
            WHERE excluded.best_score > game_bests.best_score
               OR (excluded.best_score = game_bests.best_score
                   AND excluded.best_time_ms > 0
                   AND excluded.best_time_ms < game_bests.best_time_ms)
            ",
        )
        .bind(user_id.as_str())
        .bind(game_id.as_str())
        .bind(i64::from(candidate.best_score))
        .bind(u64_to_i64("best_time_ms", candidate.best_time_ms)?)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let row = sqlx::query(
            "SELECT best_score, best_time_ms FROM game_bests WHERE user_id = ?1 AND game_id = ?2",
        )
        .bind(user_id.as_str())
        .bind(game_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(conn)?;
        let stored = map_best_row(&row)?;

        tx.commit().await.map_err(conn)?;
        Ok((stored, res.rows_affected() > 0))
    }
}
