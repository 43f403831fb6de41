use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{GameId, GameLevelId, UserId};

/// Prompt used when a stored level config has none.
pub const DEFAULT_LEVEL_PROMPT: &str = "Choose the correct answer.";

/// A published mini-game made of numbered levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub title: String,
    pub description: String,
    pub is_published: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverview {
    pub id: GameId,
    pub title: String,
    pub description: String,
    pub level_count: u32,
}

/// Author-provided content of a level: a prompt, a fixed choice list and the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer: String,
}

impl LevelConfig {
    /// Playable only with a prompt, at least one choice and an answer.
    #[must_use]
    pub fn is_playable(&self) -> bool {
        !self.prompt.trim().is_empty()
            && !self.choices.is_empty()
            && !self.answer.trim().is_empty()
    }
}

/// Stored config shape; every field may be missing in hand-edited rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLevelConfig {
    pub prompt: Option<String>,
    pub choices: Option<Vec<String>>,
    pub answer: Option<String>,
}

impl From<RawLevelConfig> for LevelConfig {
    fn from(raw: RawLevelConfig) -> Self {
        Self {
            prompt: raw.prompt.unwrap_or_else(|| DEFAULT_LEVEL_PROMPT.to_owned()),
            choices: raw.choices.unwrap_or_default(),
            answer: raw.answer.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLevel {
    pub id: GameLevelId,
    pub game_id: GameId,
    pub level_number: u32,
    pub config: LevelConfig,
}

/// A game with its levels in `level_number` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameWithLevels {
    pub game: Game,
    pub levels: Vec<GameLevel>,
}

/// Append-only log entry for one answered level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameAttempt {
    pub user_id: UserId,
    pub level_id: GameLevelId,
    pub score: u32,
    pub time_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// The retained best playthrough for one user and game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameBest {
    pub user_id: UserId,
    pub game_id: GameId,
    pub record: crate::scoring::BestRecord,
}
