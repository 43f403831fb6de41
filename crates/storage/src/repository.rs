use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use edu_core::LocalCalendar;
use edu_core::model::{
    ContinueWatchingItem, Course, CourseId, CourseOverview, Game, GameAttempt, GameId, GameLevel,
    GameLevelId, GameOverview, Lesson, LessonId, LessonProgress, QuizAttempt, QuizQuestion, User,
    UserId,
};
use edu_core::scoring::BestRecord;
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    /// No database is configured; the backend only serves the demo catalog.
    #[error("storage is not configured")]
    NotConfigured,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Read access to the learner-facing catalog: courses, lessons, quizzes, games.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Published courses ordered by title, counting published lessons only.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_published_courses(&self) -> Result<Vec<CourseOverview>, StorageError>;

    /// Fetch a course by id, published or not.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError>;

    /// Published lessons of a course in `order`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_published_lessons(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<Lesson>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn get_lesson(&self, id: &LessonId) -> Result<Option<Lesson>, StorageError>;

    /// Quiz questions for a lesson in authoring order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_questions(&self, lesson_id: &LessonId)
    -> Result<Vec<QuizQuestion>, StorageError>;

    /// Published games ordered by title.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_published_games(&self) -> Result<Vec<GameOverview>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn get_game(&self, id: &GameId) -> Result<Option<Game>, StorageError>;

    /// Levels of a game ordered by level number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_game_levels(&self, game_id: &GameId) -> Result<Vec<GameLevel>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn get_game_level(&self, id: &GameLevelId) -> Result<Option<GameLevel>, StorageError>;
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Per-user lesson progress and the reads the dashboard needs.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert or replace the record for (user, lesson).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn upsert_progress(&self, record: &LessonProgress) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read.
    async fn get_progress(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// Most recently updated record that is uncompleted or not fully watched,
    /// resolved with lesson and course titles.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be read.
    async fn latest_in_progress(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ContinueWatchingItem>, StorageError>;

    /// Completed records, optionally only those completed at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be counted.
    async fn count_completed(
        &self,
        user_id: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<u32, StorageError>;

    /// Distinct local calendar dates with at least one completion, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be read.
    async fn completion_dates(
        &self,
        user_id: &UserId,
        calendar: LocalCalendar,
    ) -> Result<Vec<NaiveDate>, StorageError>;
}

//
// ─── ATTEMPTS & BESTS ──────────────────────────────────────────────────────────
//

#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Append a scored quiz submission.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn record_quiz_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError>;

    /// A user's quiz attempts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempts cannot be read.
    async fn list_quiz_attempts(&self, user_id: &UserId) -> Result<Vec<QuizAttempt>, StorageError>;
}

#[async_trait]
pub trait GameScoreRepository: Send + Sync {
    /// Append a per-level attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the level does not exist.
    async fn record_game_attempt(&self, attempt: &GameAttempt) -> Result<(), StorageError>;

    /// A user's level attempts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempts cannot be read.
    async fn list_game_attempts(&self, user_id: &UserId) -> Result<Vec<GameAttempt>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read.
    async fn get_best(
        &self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> Result<Option<BestRecord>, StorageError>;

    /// Atomically keep the better of the stored best and `candidate`.
    ///
    /// Returns the record stored afterwards and whether `candidate` replaced it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the game does not exist.
    async fn offer_best(
        &self,
        user_id: &UserId,
        game_id: &GameId,
        candidate: BestRecord,
        at: DateTime<Utc>,
    ) -> Result<(BestRecord, bool), StorageError>;
}

//
// ─── USERS ─────────────────────────────────────────────────────────────────────
//

/// Profile fields mirrored from the identity provider on every sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    /// Promote to admin; when false an existing role is left alone.
    pub make_admin: bool,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create the user as a student (or admin), or refresh email and name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be stored.
    async fn ensure_user(&self, profile: &UserProfile) -> Result<User, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be read.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError>;
}

//
// ─── ADMIN ─────────────────────────────────────────────────────────────────────
//

/// Catalog authoring. Deletes cascade to dependent learner data.
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Every course, published or not, ordered by title.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_all_courses(&self) -> Result<Vec<CourseOverview>, StorageError>;

    /// Every lesson of a course in `order`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_all_lessons(&self, course_id: &CourseId) -> Result<Vec<Lesson>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is taken.
    async fn insert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn update_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Delete a course with its lessons, questions, progress and quiz attempts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn delete_course(&self, id: &CourseId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist, or
    /// `StorageError::Conflict` if the course already has a lesson at that order.
    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson or its course does not
    /// exist, or `StorageError::Conflict` on a duplicate order.
    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Delete a lesson with its questions, progress and quiz attempts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn delete_lesson(&self, id: &LessonId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn upsert_question(&self, question: &QuizQuestion) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the game cannot be stored.
    async fn upsert_game(&self, game: &Game) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the game does not exist, or
    /// `StorageError::Conflict` if the level number is taken by another level.
    async fn upsert_game_level(&self, level: &GameLevel) -> Result<(), StorageError>;
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Which backend a `Storage` was built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Sqlite,
    InMemory,
    /// Read-only demo catalog; learner data and authoring are unavailable.
    Mock,
}

impl StorageMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StorageMode::Sqlite => "sqlite",
            StorageMode::InMemory => "in-memory",
            StorageMode::Mock => "mock",
        }
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub quiz_attempts: Arc<dyn QuizAttemptRepository>,
    pub game_scores: Arc<dyn GameScoreRepository>,
    pub users: Arc<dyn UserRepository>,
    pub admin: Arc<dyn AdminRepository>,
    mode: StorageMode,
}

impl Storage {
    /// Build from a single repository implementing every trait.
    pub(crate) fn from_repo<R>(repo: R, mode: StorageMode) -> Self
    where
        R: CatalogRepository
            + ProgressRepository
            + QuizAttemptRepository
            + GameScoreRepository
            + UserRepository
            + AdminRepository
            + Clone
            + 'static,
    {
        Self {
            catalog: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            quiz_attempts: Arc::new(repo.clone()),
            game_scores: Arc::new(repo.clone()),
            users: Arc::new(repo.clone()),
            admin: Arc::new(repo),
            mode,
        }
    }

    /// Empty, writable storage for tests and prototyping.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repo(InMemoryRepository::new(), StorageMode::InMemory)
    }

    /// Read-only demo catalog used when no database is configured.
    #[must_use]
    pub fn mock() -> Self {
        Self::from_repo(crate::demo::demo_repository().read_only(), StorageMode::Mock)
    }

    #[must_use]
    pub fn mode(&self) -> StorageMode {
        self.mode
    }
}
