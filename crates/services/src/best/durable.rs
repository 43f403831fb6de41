use std::sync::Arc;

use async_trait::async_trait;

use edu_core::Clock;
use edu_core::model::{GameId, UserId};
use edu_core::scoring::BestRecord;
use storage::repository::GameScoreRepository;

use super::{BestSink, SinkOutcome};
use crate::error::ServiceError;

/// Per-account best kept in the database. The rule runs inside the
/// storage upsert, so concurrent offers cannot lose a better record.
#[derive(Clone)]
pub struct DurableBestSink {
    clock: Clock,
    user_id: UserId,
    scores: Arc<dyn GameScoreRepository>,
}

impl DurableBestSink {
    #[must_use]
    pub fn new(clock: Clock, user_id: UserId, scores: Arc<dyn GameScoreRepository>) -> Self {
        Self {
            clock,
            user_id,
            scores,
        }
    }
}

#[async_trait]
impl BestSink for DurableBestSink {
    fn name(&self) -> &'static str {
        "account"
    }

    async fn best(&self, game_id: &GameId) -> Result<Option<BestRecord>, ServiceError> {
        Ok(self.scores.get_best(&self.user_id, game_id).await?)
    }

    async fn offer(
        &self,
        game_id: &GameId,
        result: BestRecord,
    ) -> Result<SinkOutcome, ServiceError> {
        let (best, replaced) = self
            .scores
            .offer_best(&self.user_id, game_id, result, self.clock.now())
            .await
            .map_err(ServiceError::storage("game"))?;
        Ok(SinkOutcome { best, replaced })
    }
}
