use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::course::char_len;
use crate::model::ids::{CourseId, LessonId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title must be at least {min} characters")]
    TitleTooShort { min: usize },

    #[error("video id must be at least {min} characters")]
    VideoIdTooShort { min: usize },

    #[error("lesson order must be at least 1")]
    InvalidOrder,

    #[error("lesson notes must be at least {min} characters")]
    NotesTooShort { min: usize },
}

const MIN_TITLE: usize = 2;
const MIN_VIDEO_ID: usize = 4;
const MIN_NOTES: usize = 5;

fn check_title(title: &str) -> Result<(), LessonError> {
    if char_len(title) < MIN_TITLE {
        return Err(LessonError::TitleTooShort { min: MIN_TITLE });
    }
    Ok(())
}

fn check_video_id(video_id: &str) -> Result<(), LessonError> {
    if char_len(video_id) < MIN_VIDEO_ID {
        return Err(LessonError::VideoIdTooShort { min: MIN_VIDEO_ID });
    }
    Ok(())
}

fn check_order(order: u32) -> Result<(), LessonError> {
    if order == 0 {
        return Err(LessonError::InvalidOrder);
    }
    Ok(())
}

fn check_notes(notes: &str) -> Result<(), LessonError> {
    if char_len(notes) < MIN_NOTES {
        return Err(LessonError::NotesTooShort { min: MIN_NOTES });
    }
    Ok(())
}

/// A single video lesson. `order` is unique within its course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub course_id: CourseId,
    pub title: String,
    pub video_id: String,
    pub order: u32,
    pub notes: String,
    pub is_published: bool,
}

impl Lesson {
    /// Navigation target for the lesson page.
    #[must_use]
    pub fn href(&self) -> String {
        lesson_href(&self.course_id, &self.id)
    }

    #[must_use]
    pub fn patched(&self, patch: &LessonPatch) -> Self {
        Self {
            id: self.id.clone(),
            course_id: patch
                .course_id
                .clone()
                .unwrap_or_else(|| self.course_id.clone()),
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            video_id: patch
                .video_id
                .clone()
                .unwrap_or_else(|| self.video_id.clone()),
            order: patch.order.unwrap_or(self.order),
            notes: patch.notes.clone().unwrap_or_else(|| self.notes.clone()),
            is_published: patch.is_published.unwrap_or(self.is_published),
        }
    }
}

#[must_use]
pub fn lesson_href(course_id: &CourseId, lesson_id: &LessonId) -> String {
    format!("/courses/{course_id}/lessons/{lesson_id}")
}

/// Unvalidated input for creating a lesson.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDraft {
    pub course_id: CourseId,
    pub title: String,
    pub video_id: String,
    pub order: u32,
    pub notes: String,
    pub is_published: Option<bool>,
}

impl LessonDraft {
    /// Validate the draft and assign a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` when a field is out of range.
    pub fn validate(self) -> Result<Lesson, LessonError> {
        check_title(&self.title)?;
        check_video_id(&self.video_id)?;
        check_order(self.order)?;
        check_notes(&self.notes)?;
        Ok(Lesson {
            id: LessonId::generate(),
            course_id: self.course_id,
            title: self.title.trim().to_owned(),
            video_id: self.video_id.trim().to_owned(),
            order: self.order,
            notes: self.notes.trim().to_owned(),
            is_published: self.is_published.unwrap_or(false),
        })
    }
}

/// Partial update for a lesson, including moving it to another course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPatch {
    pub course_id: Option<CourseId>,
    pub title: Option<String>,
    pub video_id: Option<String>,
    pub order: Option<u32>,
    pub notes: Option<String>,
    pub is_published: Option<bool>,
}

impl LessonPatch {
    /// # Errors
    ///
    /// Returns `LessonError` when a present field is out of range.
    pub fn validate(self) -> Result<Self, LessonError> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(video_id) = &self.video_id {
            check_video_id(video_id)?;
        }
        if let Some(order) = self.order {
            check_order(order)?;
        }
        if let Some(notes) = &self.notes {
            check_notes(notes)?;
        }
        Ok(Self {
            course_id: self.course_id,
            title: self.title.map(|s| s.trim().to_owned()),
            video_id: self.video_id.map(|s| s.trim().to_owned()),
            order: self.order,
            notes: self.notes.map(|s| s.trim().to_owned()),
            is_published: self.is_published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> LessonDraft {
        LessonDraft {
            course_id: CourseId::new("course-logic"),
            title: "Spot the Pattern".into(),
            video_id: "mC6Y9xq-0RA".into(),
            order: 1,
            notes: "Find the next item in a pattern.".into(),
            is_published: Some(true),
        }
    }

    #[test]
    fn valid_draft_builds_lesson() {
        let lesson = draft().validate().unwrap();
        assert_eq!(lesson.order, 1);
        assert!(lesson.is_published);
        assert_eq!(
            lesson.href(),
            format!("/courses/course-logic/lessons/{}", lesson.id)
        );
    }

    #[test]
    fn order_zero_is_rejected() {
        let mut d = draft();
        d.order = 0;
        assert_eq!(d.validate().unwrap_err(), LessonError::InvalidOrder);
    }

    #[test]
    fn short_video_id_is_rejected() {
        let mut d = draft();
        d.video_id = "abc".into();
        assert!(matches!(
            d.validate(),
            Err(LessonError::VideoIdTooShort { min: 4 })
        ));
    }

    #[test]
    fn patch_moves_lesson_between_courses() {
        let lesson = draft().validate().unwrap();
        let patch = LessonPatch {
            course_id: Some(CourseId::new("course-math")),
            order: Some(4),
            ..LessonPatch::default()
        }
        .validate()
        .unwrap();
        let moved = lesson.patched(&patch);
        assert_eq!(moved.course_id, CourseId::new("course-math"));
        assert_eq!(moved.order, 4);
        assert_eq!(moved.title, lesson.title);
    }
}
