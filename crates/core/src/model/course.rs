use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title must be at least {min} characters")]
    TitleTooShort { min: usize },

    #[error("course description must be at least {min} characters")]
    DescriptionTooShort { min: usize },

    #[error("grade level must be at least {min} characters")]
    GradeLevelTooShort { min: usize },
}

const MIN_TITLE: usize = 2;
const MIN_DESCRIPTION: usize = 5;
const MIN_GRADE_LEVEL: usize = 2;

pub(crate) fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

fn check_title(title: &str) -> Result<(), CourseError> {
    if char_len(title) < MIN_TITLE {
        return Err(CourseError::TitleTooShort { min: MIN_TITLE });
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), CourseError> {
    if char_len(description) < MIN_DESCRIPTION {
        return Err(CourseError::DescriptionTooShort {
            min: MIN_DESCRIPTION,
        });
    }
    Ok(())
}

fn check_grade_level(grade_level: &str) -> Result<(), CourseError> {
    if char_len(grade_level) < MIN_GRADE_LEVEL {
        return Err(CourseError::GradeLevelTooShort {
            min: MIN_GRADE_LEVEL,
        });
    }
    Ok(())
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course groups an ordered list of lessons for one grade band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub grade_level: String,
    pub is_published: bool,
}

impl Course {
    /// Apply a validated patch, returning the updated course.
    #[must_use]
    pub fn patched(&self, patch: &CoursePatch) -> Self {
        Self {
            id: self.id.clone(),
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            grade_level: patch
                .grade_level
                .clone()
                .unwrap_or_else(|| self.grade_level.clone()),
            is_published: patch.is_published.unwrap_or(self.is_published),
        }
    }
}

/// Catalog listing entry: a course plus lesson count and entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOverview {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub grade_level: String,
    pub is_published: bool,
    pub lesson_count: u32,
    pub first_lesson_id: Option<LessonId>,
}

impl CourseOverview {
    #[must_use]
    pub fn new(course: Course, lesson_ids: &[LessonId]) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            grade_level: course.grade_level,
            is_published: course.is_published,
            lesson_count: u32::try_from(lesson_ids.len()).unwrap_or(u32::MAX),
            first_lesson_id: lesson_ids.first().cloned(),
        }
    }
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

/// Unvalidated input for creating a course.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    pub grade_level: String,
    pub is_published: Option<bool>,
}

impl CourseDraft {
    /// Validate the draft and assign a fresh id.
    ///
    /// Courses are unpublished unless the draft says otherwise.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` when a field is too short.
    pub fn validate(self) -> Result<Course, CourseError> {
        check_title(&self.title)?;
        check_description(&self.description)?;
        check_grade_level(&self.grade_level)?;
        Ok(Course {
            id: CourseId::generate(),
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            grade_level: self.grade_level.trim().to_owned(),
            is_published: self.is_published.unwrap_or(false),
        })
    }
}

/// Partial update for a course; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub grade_level: Option<String>,
    pub is_published: Option<bool>,
}

impl CoursePatch {
    /// Validate present fields and normalize surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` when a present field is too short.
    pub fn validate(self) -> Result<Self, CourseError> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        if let Some(grade_level) = &self.grade_level {
            check_grade_level(grade_level)?;
        }
        Ok(Self {
            title: self.title.map(|s| s.trim().to_owned()),
            description: self.description.map(|s| s.trim().to_owned()),
            grade_level: self.grade_level.map(|s| s.trim().to_owned()),
            is_published: self.is_published,
        })
    }
}
