//! Published catalog reads. Anonymous callers are welcome.

use axum::Json;
use axum::extract::{Path, State};
use edu_core::model::{CourseId, CourseOverview, LessonId, QuizQuestionView};
use services::{CourseDetail, LessonDetail};

use crate::error::AppResult;
use crate::state::AppState;

pub async fn list_courses(State(state): State<AppState>) -> AppResult<Json<Vec<CourseOverview>>> {
    Ok(Json(state.services.catalog().courses().await?))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
) -> AppResult<Json<CourseDetail>> {
    Ok(Json(state.services.catalog().course(&course_id).await?))
}

pub async fn get_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<LessonId>,
) -> AppResult<Json<LessonDetail>> {
    Ok(Json(state.services.catalog().lesson(&lesson_id).await?))
}

/// Quiz questions without their answers.
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(lesson_id): Path<LessonId>,
) -> AppResult<Json<Vec<QuizQuestionView>>> {
    Ok(Json(state.services.quiz().questions(&lesson_id).await?))
}
