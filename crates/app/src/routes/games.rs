//! Game catalog, per-level attempt logging and account bests.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use edu_core::model::{GameId, GameLevelId, GameOverview, GameWithLevels};
use edu_core::scoring::BestRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use services::{AttemptReport, BestOutcome};

use super::{Acknowledged, acknowledged, parse_id};
use crate::auth::RequireIdentity;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptBody {
    game_level_id: String,
    score: u32,
    time_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestQuery {
    game_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestBody {
    game_id: String,
    best_score: u32,
    best_time_ms: u64,
}

/// Stored best, `null`s when the account has none yet.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestView {
    best_score: Option<u32>,
    best_time_ms: Option<u64>,
}

impl From<Option<BestRecord>> for BestView {
    fn from(best: Option<BestRecord>) -> Self {
        Self {
            best_score: best.map(|b| b.best_score),
            best_time_ms: best.map(|b| b.best_time_ms),
        }
    }
}

pub async fn list_games(State(state): State<AppState>) -> AppResult<Json<Vec<GameOverview>>> {
    Ok(Json(state.services.games().list().await?))
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> AppResult<Json<GameWithLevels>> {
    Ok(Json(state.services.games().get(&game_id).await?))
}

pub async fn record_attempt(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    payload: Result<Json<AttemptBody>, JsonRejection>,
) -> AppResult<Json<Value>> {
    state.require_database()?;
    let Json(body) = payload?;
    let level_id: GameLevelId = parse_id(&body.game_level_id)?;

    let user = state.services.users().ensure(&identity).await?;
    state
        .services
        .games()
        .record_attempt(
            &user.id,
            AttemptReport {
                level_id,
                score: body.score,
                time_ms: body.time_ms,
            },
        )
        .await?;
    Ok(acknowledged())
}

pub async fn get_best(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    query: Result<Query<BestQuery>, QueryRejection>,
) -> AppResult<Json<BestView>> {
    state.require_database()?;
    let Query(query) = query?;
    let game_id: GameId = parse_id(&query.game_id)?;

    let user = state.services.users().ensure(&identity).await?;
    let best = state.services.games().best(&user.id, &game_id).await?;
    Ok(Json(best.into()))
}

/// Offer a finished playthrough; the stored best only moves when beaten.
pub async fn submit_best(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    payload: Result<Json<BestBody>, JsonRejection>,
) -> AppResult<Json<Acknowledged<BestOutcome>>> {
    state.require_database()?;
    let Json(body) = payload?;
    let game_id: GameId = parse_id(&body.game_id)?;

    let user = state.services.users().ensure(&identity).await?;
    let outcome = state
        .services
        .games()
        .submit_best(
            &user.id,
            &game_id,
            BestRecord::new(body.best_score, body.best_time_ms),
        )
        .await?;
    Ok(Acknowledged::with(outcome))
}
