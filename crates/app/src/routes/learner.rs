//! Signed-in learner endpoints: lesson progress, the dashboard and quizzes.

use std::collections::HashMap;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use edu_core::model::{DashboardSummary, LessonId, QuestionId};
use serde::Deserialize;
use serde_json::Value;
use services::{ProgressReport, ProgressView, QuizSubmission};

use super::{acknowledged, parse_id};
use crate::auth::{MaybeIdentity, RequireIdentity};
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    lesson_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBody {
    lesson_id: String,
    watch_percent: f64,
    #[serde(default)]
    completed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    question_id: String,
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizBody {
    lesson_id: String,
    answers: Vec<QuizAnswer>,
}

pub async fn get_progress(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    query: Result<Query<ProgressQuery>, QueryRejection>,
) -> AppResult<Json<ProgressView>> {
    state.require_database()?;
    let Query(query) = query?;
    let lesson_id: LessonId = parse_id(&query.lesson_id)?;

    let user = state.services.users().ensure(&identity).await?;
    Ok(Json(state.services.progress().get(&user.id, &lesson_id).await?))
}

/// Upsert the caller's progress; the dashboard cache is dropped on success.
pub async fn record_progress(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    payload: Result<Json<ProgressBody>, JsonRejection>,
) -> AppResult<Json<Value>> {
    state.require_database()?;
    let Json(body) = payload?;
    let lesson_id = parse_id(&body.lesson_id)?;

    let user = state.services.users().ensure(&identity).await?;
    state
        .services
        .progress()
        .record(
            &user.id,
            ProgressReport {
                lesson_id,
                watch_percent: body.watch_percent,
                completed: body.completed,
            },
        )
        .await?;
    Ok(acknowledged())
}

/// Never fails: an unavailable backend shows the zero summary.
pub async fn dashboard(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
) -> Json<DashboardSummary> {
    Json(
        state
            .services
            .dashboard()
            .summary_or_zero(&identity.user_id)
            .await,
    )
}

/// Score a quiz. Signed-in callers get the attempt saved.
pub async fn submit_quiz(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    payload: Result<Json<QuizBody>, JsonRejection>,
) -> AppResult<Json<QuizSubmission>> {
    state.require_database()?;
    let Json(body) = payload?;
    let lesson_id: LessonId = parse_id(&body.lesson_id)?;
    let mut answers: HashMap<QuestionId, String> = HashMap::with_capacity(body.answers.len());
    for answer in body.answers {
        answers.insert(parse_id(&answer.question_id)?, answer.answer.trim().to_owned());
    }

    let user = match &identity {
        Some(identity) => Some(state.services.users().ensure(identity).await?),
        None => None,
    };
    let submission = state
        .services
        .quiz()
        .submit(user.as_ref().map(|u| &u.id), &lesson_id, &answers)
        .await?;
    Ok(Json(submission))
}
