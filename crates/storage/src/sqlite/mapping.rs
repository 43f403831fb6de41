use chrono::NaiveDate;
use edu_core::model::{
    Course, CourseId, Game, GameId, GameLevel, GameLevelId, Lesson, LessonId, LessonProgress,
    LevelConfig, QuestionId, QuestionKind, QuizQuestion, RawLevelConfig, Role, User, UserId,
    WatchPercent,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Classify driver errors: constraint violations become domain outcomes.
pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

/// `SQLite` date modifier shifting UTC into the calendar's local time.
pub(crate) fn offset_modifier(offset_minutes: i32) -> String {
    format!("{offset_minutes:+} minutes")
}

pub(crate) fn parse_day(raw: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(ser)
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    Ok(Course {
        id: CourseId::new(row.try_get::<String, _>("id").map_err(ser)?),
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        grade_level: row.try_get("grade_level").map_err(ser)?,
        is_published: row.try_get("is_published").map_err(ser)?,
    })
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Ok(Lesson {
        id: LessonId::new(row.try_get::<String, _>("id").map_err(ser)?),
        course_id: CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?),
        title: row.try_get("title").map_err(ser)?,
        video_id: row.try_get("video_id").map_err(ser)?,
        order: i64_to_u32("lesson_order", row.try_get("lesson_order").map_err(ser)?)?,
        notes: row.try_get("notes").map_err(ser)?,
        is_published: row.try_get("is_published").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<QuizQuestion, StorageError> {
    let kind: QuestionKind = row
        .try_get::<String, _>("kind")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let options = row
        .try_get::<Option<String>, _>("options")
        .map_err(ser)?
        .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
        .transpose()
        .map_err(ser)?;
    Ok(QuizQuestion {
        id: QuestionId::new(row.try_get::<String, _>("id").map_err(ser)?),
        lesson_id: LessonId::new(row.try_get::<String, _>("lesson_id").map_err(ser)?),
        kind,
        prompt: row.try_get("prompt").map_err(ser)?,
        options,
        answer: row.try_get("answer").map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
    })
}

pub(crate) fn options_to_json(options: Option<&Vec<String>>) -> Result<Option<String>, StorageError> {
    options.map(serde_json::to_string).transpose().map_err(ser)
}

pub(crate) fn map_game_row(row: &SqliteRow) -> Result<Game, StorageError> {
    Ok(Game {
        id: GameId::new(row.try_get::<String, _>("id").map_err(ser)?),
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        is_published: row.try_get("is_published").map_err(ser)?,
    })
}

pub(crate) fn map_level_row(row: &SqliteRow) -> Result<GameLevel, StorageError> {
    let raw: String = row.try_get("config").map_err(ser)?;
    // Hand-edited configs that do not parse surface as unplayable levels.
    let config = LevelConfig::from(serde_json::from_str::<RawLevelConfig>(&raw).unwrap_or_default());
    Ok(GameLevel {
        id: GameLevelId::new(row.try_get::<String, _>("id").map_err(ser)?),
        game_id: GameId::new(row.try_get::<String, _>("game_id").map_err(ser)?),
        level_number: i64_to_u32("level_number", row.try_get("level_number").map_err(ser)?)?,
        config,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<LessonProgress, StorageError> {
    let percent = i64_to_u32("watch_percent", row.try_get("watch_percent").map_err(ser)?)?;
    let percent = u8::try_from(percent).map_err(ser)?;
    Ok(LessonProgress {
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        lesson_id: LessonId::new(row.try_get::<String, _>("lesson_id").map_err(ser)?),
        watch_percent: WatchPercent::from_u8(percent).map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let role: Role = row
        .try_get::<String, _>("role")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    Ok(User {
        id: UserId::new(row.try_get::<String, _>("id").map_err(ser)?),
        email: row.try_get("email").map_err(ser)?,
        name: row.try_get("name").map_err(ser)?,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_modifier_is_signed() {
        assert_eq!(offset_modifier(120), "+120 minutes");
        assert_eq!(offset_modifier(-330), "-330 minutes");
        assert_eq!(offset_modifier(0), "+0 minutes");
    }

    #[test]
    fn parses_sqlite_dates() {
        assert_eq!(
            parse_day("2024-03-13").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 13).unwrap()
        );
        assert!(parse_day("13/03/2024").is_err());
    }
}
