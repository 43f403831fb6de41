use std::sync::Arc;

use edu_core::model::{
    Course, CourseDraft, CourseId, CourseOverview, CoursePatch, Lesson, LessonDraft, LessonId,
    LessonPatch,
};
use storage::repository::{AdminRepository, CatalogRepository, StorageError};

use crate::error::ServiceError;

const ORDER_TAKEN: &str = "another lesson in this course already uses that order";

fn lesson_write_error(err: StorageError) -> ServiceError {
    match err {
        StorageError::NotFound => ServiceError::NotFound("course"),
        StorageError::Conflict => ServiceError::Conflict(ORDER_TAKEN),
        other => other.into(),
    }
}

/// Catalog authoring for admins. Callers check the role first.
#[derive(Clone)]
pub struct AdminService {
    catalog: Arc<dyn CatalogRepository>,
    admin: Arc<dyn AdminRepository>,
}

impl AdminService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, admin: Arc<dyn AdminRepository>) -> Self {
        Self { catalog, admin }
    }

    /// Every course including drafts. Empty when no database is configured.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the catalog cannot be read.
    pub async fn courses(&self) -> Result<Vec<CourseOverview>, ServiceError> {
        match self.admin.list_all_courses().await {
            Err(StorageError::NotConfigured) => Ok(Vec::new()),
            other => Ok(other?),
        }
    }

    /// Every lesson of a course including drafts.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown course.
    pub async fn lessons(&self, course_id: &CourseId) -> Result<Vec<Lesson>, ServiceError> {
        self.course(course_id).await?;
        Ok(self.admin.list_all_lessons(course_id).await?)
    }

    async fn course(&self, course_id: &CourseId) -> Result<Course, ServiceError> {
        self.catalog
            .get_course(course_id)
            .await?
            .ok_or(ServiceError::NotFound("course"))
    }

    async fn lesson(&self, lesson_id: &LessonId) -> Result<Lesson, ServiceError> {
        self.catalog
            .get_lesson(lesson_id)
            .await?
            .ok_or(ServiceError::NotFound("lesson"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::InvalidInput` for a failing draft, or
    /// `ServiceError::NotConfigured` without a database.
    pub async fn create_course(&self, draft: CourseDraft) -> Result<Course, ServiceError> {
        let course = draft.validate().map_err(ServiceError::invalid)?;
        self.admin.insert_course(&course).await?;
        tracing::info!(course = %course.id, title = %course.title, "course created");
        Ok(course)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::InvalidInput` for a failing patch, or
    /// `ServiceError::NotFound` for an unknown course.
    pub async fn update_course(
        &self,
        course_id: &CourseId,
        patch: CoursePatch,
    ) -> Result<Course, ServiceError> {
        let patch = patch.validate().map_err(ServiceError::invalid)?;
        let updated = self.course(course_id).await?.patched(&patch);
        self.admin
            .update_course(&updated)
            .await
            .map_err(ServiceError::storage("course"))?;
        Ok(updated)
    }

    /// Delete a course with everything hanging off its lessons.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown course.
    pub async fn delete_course(&self, course_id: &CourseId) -> Result<(), ServiceError> {
        self.admin
            .delete_course(course_id)
            .await
            .map_err(ServiceError::storage("course"))?;
        tracing::info!(course = %course_id, "course deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::InvalidInput` for a failing draft,
    /// `ServiceError::NotFound` for an unknown course, or
    /// `ServiceError::Conflict` when the order is taken.
    pub async fn create_lesson(&self, draft: LessonDraft) -> Result<Lesson, ServiceError> {
        let lesson = draft.validate().map_err(ServiceError::invalid)?;
        self.course(&lesson.course_id).await?;
        self.admin
            .insert_lesson(&lesson)
            .await
            .map_err(lesson_write_error)?;
        tracing::info!(lesson = %lesson.id, course = %lesson.course_id, "lesson created");
        Ok(lesson)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::InvalidInput` for a failing patch,
    /// `ServiceError::NotFound` for an unknown lesson or target course, or
    /// `ServiceError::Conflict` when the order is taken.
    pub async fn update_lesson(
        &self,
        lesson_id: &LessonId,
        patch: LessonPatch,
    ) -> Result<Lesson, ServiceError> {
        let patch = patch.validate().map_err(ServiceError::invalid)?;
        let updated = self.lesson(lesson_id).await?.patched(&patch);
        if patch.course_id.is_some() {
            self.course(&updated.course_id).await?;
        }
        self.admin
            .update_lesson(&updated)
            .await
            .map_err(lesson_write_error)?;
        Ok(updated)
    }

    /// Delete a lesson with its questions, progress and quiz attempts.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown lesson.
    pub async fn delete_lesson(&self, lesson_id: &LessonId) -> Result<(), ServiceError> {
        self.admin
            .delete_lesson(lesson_id)
            .await
            .map_err(ServiceError::storage("lesson"))?;
        tracing::info!(lesson = %lesson_id, "lesson deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::demo::seed_demo_catalog;
    use storage::repository::Storage;

    async fn setup() -> (Storage, AdminService) {
        let storage = Storage::in_memory();
        seed_demo_catalog(&storage).await.unwrap();
        let admin = AdminService::new(Arc::clone(&storage.catalog), Arc::clone(&storage.admin));
        (storage, admin)
    }

    fn lesson_draft(course: &str, order: u32) -> LessonDraft {
        LessonDraft {
            course_id: CourseId::new(course),
            title: "Shapes Everywhere".into(),
            video_id: "abcd1234".into(),
            order,
            notes: "Look for shapes around the house.".into(),
            is_published: None,
        }
    }

    #[tokio::test]
    async fn created_course_is_a_draft_visible_to_admins_only() {
        let (storage, admin) = setup().await;
        let course = admin
            .create_course(CourseDraft {
                title: "  Space Science ".into(),
                description: "Planets and stars.".into(),
                grade_level: "Grades 2-4".into(),
                is_published: None,
            })
            .await
            .unwrap();
        assert_eq!(course.title, "Space Science");
        assert!(!course.is_published);

        assert_eq!(admin.courses().await.unwrap().len(), 3);
        assert_eq!(storage.catalog.list_published_courses().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn short_fields_are_invalid_input() {
        let (_, admin) = setup().await;
        let err = admin
            .create_course(CourseDraft {
                title: "X".into(),
                description: "Long enough".into(),
                grade_level: "K-2".into(),
                is_published: Some(true),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn patch_changes_only_given_fields() {
        let (_, admin) = setup().await;
        let updated = admin
            .update_course(
                &CourseId::new("course-math"),
                CoursePatch {
                    is_published: Some(false),
                    ..CoursePatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Math Adventures");
        assert!(!updated.is_published);

        let err = admin
            .update_course(&CourseId::new("nope"), CoursePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("course")));
    }

    #[tokio::test]
    async fn lesson_order_conflicts_and_missing_courses() {
        let (_, admin) = setup().await;
        let err = admin
            .create_lesson(lesson_draft("course-logic", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = admin
            .create_lesson(lesson_draft("course-missing", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("course")));

        let created = admin
            .create_lesson(lesson_draft("course-logic", 7))
            .await
            .unwrap();
        let err = admin
            .update_lesson(
                &created.id,
                LessonPatch {
                    order: Some(2),
                    ..LessonPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let moved = admin
            .update_lesson(
                &created.id,
                LessonPatch {
                    course_id: Some(CourseId::new("course-math")),
                    ..LessonPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.course_id, CourseId::new("course-math"));
        assert_eq!(
            admin.lessons(&CourseId::new("course-math")).await.unwrap().len(),
            4
        );
    }

    #[tokio::test]
    async fn deletes_report_missing_rows() {
        let (storage, admin) = setup().await;
        admin
            .delete_lesson(&LessonId::new("lesson-logic-1"))
            .await
            .unwrap();
        assert!(
            storage
                .catalog
                .list_questions(&LessonId::new("lesson-logic-1"))
                .await
                .unwrap()
                .is_empty()
        );

        let err = admin
            .delete_lesson(&LessonId::new("lesson-logic-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("lesson")));

        admin.delete_course(&CourseId::new("course-logic")).await.unwrap();
        let err = admin
            .delete_course(&CourseId::new("course-logic"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("course")));
    }

    #[tokio::test]
    async fn demo_backend_lists_nothing_and_refuses_writes() {
        let storage = Storage::mock();
        let admin = AdminService::new(Arc::clone(&storage.catalog), Arc::clone(&storage.admin));
        assert!(admin.courses().await.unwrap().is_empty());

        let err = admin
            .delete_course(&CourseId::new("course-logic"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured));
    }
}
