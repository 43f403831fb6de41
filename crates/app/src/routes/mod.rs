//! Route table.

pub mod admin;
pub mod catalog;
pub mod games;
pub mod health;
pub mod learner;

use std::str::FromStr;

use axum::{Json, Router};
use axum::routing::{get, patch, post};
use edu_core::model::ParseIdError;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// `{"ok": true}` merged with the fields of `T`.
#[derive(Debug, Serialize)]
pub struct Acknowledged<T: Serialize> {
    ok: bool,
    #[serde(flatten)]
    body: T,
}

impl<T: Serialize> Acknowledged<T> {
    #[must_use]
    pub fn with(body: T) -> Json<Self> {
        Json(Self { ok: true, body })
    }
}

#[must_use]
pub fn acknowledged() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Parse an id from a request body; blank ids are a bad request.
pub(crate) fn parse_id<T>(raw: &str) -> AppResult<T>
where
    T: FromStr<Err = ParseIdError>,
{
    raw.parse()
        .map_err(|err: ParseIdError| AppError::BadRequest(err.to_string()))
}

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/health", get(health::health))
        // Catalog
        .route("/api/courses", get(catalog::list_courses))
        .route("/api/courses/{course_id}", get(catalog::get_course))
        .route("/api/lessons/{lesson_id}", get(catalog::get_lesson))
        .route("/api/lessons/{lesson_id}/quiz", get(catalog::get_quiz))
        // Learner
        .route(
            "/api/progress",
            get(learner::get_progress).post(learner::record_progress),
        )
        .route("/api/dashboard", get(learner::dashboard))
        .route("/api/quiz/submit", post(learner::submit_quiz))
        // Games
        .route("/api/games", get(games::list_games))
        .route("/api/games/attempt", post(games::record_attempt))
        .route("/api/games/best", get(games::get_best).post(games::submit_best))
        .route("/api/games/{game_id}", get(games::get_game))
        // Authoring
        .route("/api/admin/courses", get(admin::list_courses))
        .route(
            "/api/admin/courses/{course_id}/lessons",
            get(admin::list_lessons),
        )
        .route("/api/admin/course", post(admin::create_course))
        .route(
            "/api/admin/course/{course_id}",
            patch(admin::update_course).delete(admin::delete_course),
        )
        .route("/api/admin/lesson", post(admin::create_lesson))
        .route(
            "/api/admin/lesson/{lesson_id}",
            patch(admin::update_lesson).delete(admin::delete_lesson),
        )
}
