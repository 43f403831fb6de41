use thiserror::Error;

use crate::model::{CourseError, LessonError, ParseIdError, ProgressError, QuizError};
use crate::playthrough::PlaythroughError;
use crate::scoring::ScoringError;

/// Any domain rule violation raised by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Playthrough(#[from] PlaythroughError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
