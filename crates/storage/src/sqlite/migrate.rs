use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            name TEXT,
            role TEXT NOT NULL CHECK (role IN ('STUDENT', 'ADMIN')),
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            grade_level TEXT NOT NULL,
            is_published INTEGER NOT NULL DEFAULT 0
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lessons (
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            title TEXT NOT NULL,
            video_id TEXT NOT NULL,
            lesson_order INTEGER NOT NULL CHECK (lesson_order >= 1),
            notes TEXT NOT NULL,
            is_published INTEGER NOT NULL DEFAULT 0,
            UNIQUE (course_id, lesson_order),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_questions (
            id TEXT PRIMARY KEY,
            lesson_id TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('MULTIPLE_CHOICE', 'SHORT_ANSWER')),
            prompt TEXT NOT NULL,
            options TEXT,
            answer TEXT NOT NULL,
            explanation TEXT,
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lesson_progress (
            user_id TEXT NOT NULL,
            lesson_id TEXT NOT NULL,
            watch_percent INTEGER NOT NULL CHECK (watch_percent BETWEEN 0 AND 100),
            completed_at TEXT,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, lesson_id),
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_attempts (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            lesson_id TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score >= 0),
            created_at TEXT NOT NULL,
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS games (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            is_published INTEGER NOT NULL DEFAULT 0
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS game_levels (
            id TEXT PRIMARY KEY,
            game_id TEXT NOT NULL,
            level_number INTEGER NOT NULL CHECK (level_number >= 1),
            config TEXT NOT NULL,
            UNIQUE (game_id, level_number),
            FOREIGN KEY (game_id) REFERENCES games(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS game_attempts (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            game_level_id TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score >= 0),
            time_ms INTEGER NOT NULL CHECK (time_ms >= 0),
            created_at TEXT NOT NULL,
            FOREIGN KEY (game_level_id) REFERENCES game_levels(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS game_bests (
            user_id TEXT NOT NULL,
            game_id TEXT NOT NULL,
            best_score INTEGER NOT NULL CHECK (best_score >= 0),
            best_time_ms INTEGER NOT NULL CHECK (best_time_ms >= 0),
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, game_id),
            FOREIGN KEY (game_id) REFERENCES games(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_lesson_progress_user_updated
            ON lesson_progress (user_id, updated_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_lesson_progress_user_completed
            ON lesson_progress (user_id, completed_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_attempts_user
            ON quiz_attempts (user_id, created_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_game_attempts_user
            ON game_attempts (user_id, created_at);
    ",
];

/// Applies the versioned schema. Each version runs once, inside a transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
