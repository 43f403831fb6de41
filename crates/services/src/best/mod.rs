//! Best-score tracking across independent stores.
//!
//! A finished playthrough is offered to every sink; each keeps the better
//! of its stored record and the offer on its own. Sinks are never
//! reconciled with each other.

mod device;
mod durable;

use std::sync::Arc;

use async_trait::async_trait;

use edu_core::model::GameId;
use edu_core::scoring::BestRecord;

use crate::error::ServiceError;

pub use device::{
    DeviceBestSink, DeviceStore, DeviceStoreError, FileDeviceStore, MemoryDeviceStore, best_key,
};
pub use durable::DurableBestSink;

/// What a sink kept after an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkOutcome {
    pub best: BestRecord,
    pub replaced: bool,
}

/// A place that retains the best result per game.
#[async_trait]
pub trait BestSink: Send + Sync {
    /// Short label used in logs and reports.
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns `ServiceError` if the sink cannot be read.
    async fn best(&self, game_id: &GameId) -> Result<Option<BestRecord>, ServiceError>;

    /// Apply the best-record rule to `result`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if the sink cannot be updated.
    async fn offer(&self, game_id: &GameId, result: BestRecord)
    -> Result<SinkOutcome, ServiceError>;
}

/// One sink's answer to a finished playthrough.
#[derive(Debug)]
pub struct SinkReport {
    pub sink: &'static str,
    pub outcome: Result<SinkOutcome, ServiceError>,
}

/// Everything the finisher learned.
#[derive(Debug)]
pub struct FinishReport {
    pub result: BestRecord,
    /// Best to show the player: the authoritative sink's record when it
    /// answered, else the first sink that answered, else `result`.
    pub presented: BestRecord,
    pub sinks: Vec<SinkReport>,
    authority: Option<usize>,
}

impl FinishReport {
    /// Failures to surface as non-blocking warnings.
    pub fn warnings(&self) -> impl Iterator<Item = String> + '_ {
        self.sinks.iter().filter_map(|report| {
            report
                .outcome
                .as_ref()
                .err()
                .map(|err| format!("{} best not saved: {err}", report.sink))
        })
    }

    /// Whether the result replaced the best the player is shown.
    #[must_use]
    pub fn is_new_best(&self) -> bool {
        let authoritative = self
            .authority
            .and_then(|i| self.sinks.get(i))
            .and_then(|r| r.outcome.as_ref().ok());
        match authoritative {
            Some(outcome) => outcome.replaced,
            None => self
                .sinks
                .iter()
                .any(|r| matches!(r.outcome, Ok(SinkOutcome { replaced: true, .. }))),
        }
    }
}

/// Offers finished results to a list of sinks in order.
///
/// At most one sink is authoritative: reads consult it before the others,
/// so a signed-in player sees the account record rather than a device
/// copy. Writes go to every sink regardless.
#[derive(Clone, Default)]
pub struct BestTracker {
    sinks: Vec<Arc<dyn BestSink>>,
    authority: Option<usize>,
}

impl BestTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn BestSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Add `sink` and make it the one reads trust first.
    #[must_use]
    pub fn with_authoritative_sink(mut self, sink: Arc<dyn BestSink>) -> Self {
        self.authority = Some(self.sinks.len());
        self.sinks.push(sink);
        self
    }

    /// Sink indices in read order: the authoritative sink, then the rest.
    fn read_order(&self) -> impl Iterator<Item = usize> + '_ {
        let authority = self.authority;
        authority
            .into_iter()
            .chain((0..self.sinks.len()).filter(move |&i| Some(i) != authority))
    }

    /// Best currently shown for `game_id`.
    pub async fn best(&self, game_id: &GameId) -> Option<BestRecord> {
        for sink in self.read_order().map(|i| &self.sinks[i]) {
            match sink.best(game_id).await {
                Ok(Some(best)) => return Some(best),
                Ok(None) => {}
                Err(err) => tracing::warn!(sink = sink.name(), error = %err, "best unreadable"),
            }
        }
        None
    }

    /// Offer `result` to every sink. A failing sink never blocks the others.
    pub async fn finish(&self, game_id: &GameId, result: BestRecord) -> FinishReport {
        let mut sinks = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let outcome = sink.offer(game_id, result).await;
            match &outcome {
                Ok(o) => tracing::debug!(
                    sink = sink.name(),
                    game = %game_id,
                    replaced = o.replaced,
                    "best offered"
                ),
                Err(err) => tracing::warn!(
                    sink = sink.name(),
                    game = %game_id,
                    error = %err,
                    "best not saved"
                ),
            }
            sinks.push(SinkReport {
                sink: sink.name(),
                outcome,
            });
        }

        let presented = self
            .read_order()
            .find_map(|i| sinks[i].outcome.as_ref().ok().map(|o| o.best))
            .unwrap_or(result);

        FinishReport {
            result,
            presented,
            sinks,
            authority: self.authority,
        }
    }
}
