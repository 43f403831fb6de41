use std::sync::Arc;

use serde::Serialize;

use edu_core::model::{Course, CourseId, CourseOverview, Lesson, LessonId};
use storage::repository::CatalogRepository;

use crate::error::ServiceError;

/// A published course with its published lessons in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

/// A published lesson with enough context to render its page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDetail {
    pub lesson: Lesson,
    pub course_title: String,
    pub href: String,
    pub next_lesson_id: Option<LessonId>,
}

/// Learner-facing course and lesson reads. Unpublished content is invisible.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the catalog cannot be read.
    pub async fn courses(&self) -> Result<Vec<CourseOverview>, ServiceError> {
        Ok(self.catalog.list_published_courses().await?)
    }

    async fn published_course(&self, course_id: &CourseId) -> Result<Course, ServiceError> {
        match self.catalog.get_course(course_id).await? {
            Some(course) if course.is_published => Ok(course),
            _ => Err(ServiceError::NotFound("course")),
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the course is missing or unpublished.
    pub async fn course(&self, course_id: &CourseId) -> Result<CourseDetail, ServiceError> {
        let course = self.published_course(course_id).await?;
        let lessons = self.catalog.list_published_lessons(course_id).await?;
        Ok(CourseDetail { course, lessons })
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the lesson or its course is
    /// missing or unpublished.
    pub async fn lesson(&self, lesson_id: &LessonId) -> Result<LessonDetail, ServiceError> {
        let lesson = match self.catalog.get_lesson(lesson_id).await? {
            Some(lesson) if lesson.is_published => lesson,
            _ => return Err(ServiceError::NotFound("lesson")),
        };
        let course = self.published_course(&lesson.course_id).await?;
        let siblings = self.catalog.list_published_lessons(&course.id).await?;
        let next_lesson_id = siblings
            .iter()
            .find(|l| l.order > lesson.order)
            .map(|l| l.id.clone());

        Ok(LessonDetail {
            href: lesson.href(),
            course_title: course.title,
            next_lesson_id,
            lesson,
        })
    }
}
