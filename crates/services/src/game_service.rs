use std::sync::Arc;

use serde::Serialize;

use edu_core::Clock;
use edu_core::model::{
    GameAttempt, GameId, GameLevelId, GameOverview, GameWithLevels, UserId,
};
use edu_core::scoring::BestRecord;
use storage::repository::{CatalogRepository, GameScoreRepository};

use crate::best::{BestSink, DurableBestSink};
use crate::error::ServiceError;

/// A per-level result reported by a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    pub level_id: GameLevelId,
    pub score: u32,
    pub time_ms: u64,
}

/// The stored best after an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestOutcome {
    #[serde(flatten)]
    pub best: BestRecord,
    pub replaced: bool,
}

/// Game catalog reads, attempt logging and per-account bests.
#[derive(Clone)]
pub struct GameService {
    clock: Clock,
    durable: bool,
    catalog: Arc<dyn CatalogRepository>,
    scores: Arc<dyn GameScoreRepository>,
}

impl GameService {
    #[must_use]
    pub fn new(
        clock: Clock,
        durable: bool,
        catalog: Arc<dyn CatalogRepository>,
        scores: Arc<dyn GameScoreRepository>,
    ) -> Self {
        Self {
            clock,
            durable,
            catalog,
            scores,
        }
    }

    fn require_durable(&self) -> Result<(), ServiceError> {
        if self.durable {
            Ok(())
        } else {
            Err(ServiceError::NotConfigured)
        }
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the catalog cannot be read.
    pub async fn list(&self) -> Result<Vec<GameOverview>, ServiceError> {
        Ok(self.catalog.list_published_games().await?)
    }

    /// A published game with its levels in order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the game is missing or unpublished.
    pub async fn get(&self, game_id: &GameId) -> Result<GameWithLevels, ServiceError> {
        let game = match self.catalog.get_game(game_id).await? {
            Some(game) if game.is_published => game,
            _ => return Err(ServiceError::NotFound("game")),
        };
        let levels = self.catalog.list_game_levels(game_id).await?;
        Ok(GameWithLevels { game, levels })
    }

    /// Append a per-level attempt.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotConfigured` without a database, or
    /// `ServiceError::NotFound` for an unknown level.
    pub async fn record_attempt(
        &self,
        user_id: &UserId,
        report: AttemptReport,
    ) -> Result<(), ServiceError> {
        self.require_durable()?;
        if self.catalog.get_game_level(&report.level_id).await?.is_none() {
            return Err(ServiceError::NotFound("level"));
        }
        self.scores
            .record_game_attempt(&GameAttempt {
                user_id: user_id.clone(),
                level_id: report.level_id,
                score: report.score,
                time_ms: report.time_ms,
                created_at: self.clock.now(),
            })
            .await
            .map_err(ServiceError::storage("level"))
    }

    /// The account's stored best for a game, if any.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotConfigured` without a database.
    pub async fn best(
        &self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> Result<Option<BestRecord>, ServiceError> {
        self.require_durable()?;
        Ok(self.scores.get_best(user_id, game_id).await?)
    }

    /// Offer a finished result to the account's best.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotConfigured` without a database, or
    /// `ServiceError::NotFound` for an unknown game.
    pub async fn submit_best(
        &self,
        user_id: &UserId,
        game_id: &GameId,
        result: BestRecord,
    ) -> Result<BestOutcome, ServiceError> {
        self.require_durable()?;
        if self.catalog.get_game(game_id).await?.is_none() {
            return Err(ServiceError::NotFound("game"));
        }
        let outcome = self.durable_sink(user_id).offer(game_id, result).await?;
        Ok(BestOutcome {
            best: outcome.best,
            replaced: outcome.replaced,
        })
    }

    /// The account best as a sink for the playthrough finisher.
    #[must_use]
    pub fn durable_sink(&self, user_id: &UserId) -> DurableBestSink {
        DurableBestSink::new(self.clock, user_id.clone(), Arc::clone(&self.scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use edu_core::time::fixed_now;
    use storage::demo::seed_demo_catalog;
    use storage::repository::Storage;

    async fn setup() -> (Storage, GameService) {
        let storage = Storage::in_memory();
        seed_demo_catalog(&storage).await.unwrap();
        let games = GameService::new(
            Clock::fixed(fixed_now()),
            true,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.game_scores),
        );
        (storage, games)
    }

    #[tokio::test]
    async fn game_detail_lists_levels_in_order() {
        let (_, games) = setup().await;
        let detail = games.get(&GameId::new("game-logic-quest")).await.unwrap();
        let numbers: Vec<u32> = detail.levels.iter().map(|l| l.level_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        let err = games.get(&GameId::new("nope")).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("game")));
    }

    #[tokio::test]
    async fn attempts_need_a_known_level() {
        let (storage, games) = setup().await;
        let user = UserId::new("u-1");
        games
            .record_attempt(
                &user,
                AttemptReport {
                    level_id: GameLevelId::new("level-logic-2"),
                    score: 1,
                    time_ms: 3_200,
                },
            )
            .await
            .unwrap();
        let logged = storage.game_scores.list_game_attempts(&user).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].time_ms, 3_200);

        let err = games
            .record_attempt(
                &user,
                AttemptReport {
                    level_id: GameLevelId::new("level-missing"),
                    score: 0,
                    time_ms: 0,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("level")));
    }

    #[tokio::test]
    async fn submitted_best_keeps_the_better_run() {
        let (_, games) = setup().await;
        let user = UserId::new("u-1");
        let game = GameId::new("game-logic-quest");

        assert_eq!(games.best(&user, &game).await.unwrap(), None);

        let first = games
            .submit_best(&user, &game, BestRecord::new(3, 12_000))
            .await
            .unwrap();
        assert!(first.replaced);

        let slower = games
            .submit_best(&user, &game, BestRecord::new(3, 15_000))
            .await
            .unwrap();
        assert!(!slower.replaced);
        assert_eq!(slower.best, BestRecord::new(3, 12_000));

        let json = serde_json::to_value(slower).unwrap();
        assert_eq!(json["bestScore"], 3);
        assert_eq!(json["bestTimeMs"], 12_000);
        assert_eq!(json["replaced"], false);

        let err = games
            .submit_best(&user, &GameId::new("nope"), BestRecord::new(1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("game")));
    }

    #[tokio::test]
    async fn demo_backend_has_no_account_bests() {
        let storage = Storage::mock();
        let games = GameService::new(
            Clock::fixed(fixed_now()),
            false,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.game_scores),
        );
        let err = games
            .best(&UserId::new("u-1"), &GameId::new("game-logic-quest"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured));
        assert_eq!(games.list().await.unwrap().len(), 1);
    }
}
