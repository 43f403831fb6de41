//! Catalog authoring. Every handler checks the admin gate before reading the body.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use edu_core::model::{
    CourseDraft, CourseId, CourseOverview, CoursePatch, Lesson, LessonDraft, LessonId, LessonPatch,
};
use serde_json::{Value, json};

use super::acknowledged;
use crate::auth::MaybeIdentity;
use crate::error::AppResult;
use crate::state::AppState;

async fn require_admin(state: &AppState, identity: &MaybeIdentity) -> AppResult<()> {
    state
        .services
        .users()
        .require_admin(identity.0.as_ref())
        .await?;
    Ok(())
}

pub async fn list_courses(
    State(state): State<AppState>,
    identity: MaybeIdentity,
) -> AppResult<Json<Vec<CourseOverview>>> {
    require_admin(&state, &identity).await?;
    Ok(Json(state.services.admin().courses().await?))
}

pub async fn list_lessons(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    Path(course_id): Path<CourseId>,
) -> AppResult<Json<Vec<Lesson>>> {
    require_admin(&state, &identity).await?;
    Ok(Json(state.services.admin().lessons(&course_id).await?))
}

pub async fn create_course(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    payload: Result<Json<CourseDraft>, JsonRejection>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &identity).await?;
    let Json(draft) = payload?;
    let course = state.services.admin().create_course(draft).await?;
    Ok(Json(json!({ "ok": true, "courseId": course.id })))
}

pub async fn update_course(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    Path(course_id): Path<CourseId>,
    payload: Result<Json<CoursePatch>, JsonRejection>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &identity).await?;
    let Json(patch) = payload?;
    let course = state
        .services
        .admin()
        .update_course(&course_id, patch)
        .await?;
    Ok(Json(json!({ "ok": true, "course": course })))
}

/// Removes the course, its lessons and everything recorded against them.
pub async fn delete_course(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    Path(course_id): Path<CourseId>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &identity).await?;
    state.services.admin().delete_course(&course_id).await?;
    Ok(acknowledged())
}

pub async fn create_lesson(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    payload: Result<Json<LessonDraft>, JsonRejection>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &identity).await?;
    let Json(draft) = payload?;
    let lesson = state.services.admin().create_lesson(draft).await?;
    Ok(Json(json!({ "ok": true, "lessonId": lesson.id })))
}

pub async fn update_lesson(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    Path(lesson_id): Path<LessonId>,
    payload: Result<Json<LessonPatch>, JsonRejection>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &identity).await?;
    let Json(patch) = payload?;
    let lesson = state
        .services
        .admin()
        .update_lesson(&lesson_id, patch)
        .await?;
    Ok(Json(json!({ "ok": true, "lesson": lesson })))
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    Path(lesson_id): Path<LessonId>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &identity).await?;
    state.services.admin().delete_lesson(&lesson_id).await?;
    Ok(acknowledged())
}
