mod course;
mod game;
mod ids;
mod lesson;
mod progress;
mod quiz;
mod user;

pub use ids::{CourseId, GameId, GameLevelId, LessonId, ParseIdError, QuestionId, UserId};

pub use course::{Course, CourseDraft, CourseError, CourseOverview, CoursePatch};
pub use game::{
    DEFAULT_LEVEL_PROMPT, Game, GameAttempt, GameBest, GameLevel, GameOverview, GameWithLevels,
    LevelConfig, RawLevelConfig,
};
pub use lesson::{Lesson, LessonDraft, LessonError, LessonPatch, lesson_href};
pub use progress::{
    ContinueWatchingItem, DashboardSummary, LessonProgress, ProgressError, WatchPercent,
};
pub use quiz::{QuestionKind, QuizAttempt, QuizError, QuizQuestion, QuizQuestionView};
pub use user::{Identity, Role, UnknownRole, User};
