use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use edu_core::model::{DashboardSummary, UserId};
use edu_core::streak::streak_days;
use edu_core::{Clock, LocalCalendar};
use storage::repository::{ProgressRepository, StorageError};

use crate::error::DashboardError;

/// Default lifetime of a cached summary, in seconds.
pub const DEFAULT_CACHE_SECS: i64 = 60;

//
// ─── CACHE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct CachedSummary {
    summary: DashboardSummary,
    computed_at: DateTime<Utc>,
}

type Slot = Arc<Mutex<Option<CachedSummary>>>;

/// Per-user summary cache.
///
/// Each user has a slot guarded by its own async lock, so concurrent
/// requests for one user wait for a single computation while other users
/// proceed. Invalidation drops the slot; a computation still running
/// against a dropped slot can no longer be observed. Idle slots past the
/// TTL are swept whenever a new user's slot is created.
#[derive(Debug)]
pub struct DashboardCache {
    ttl: Duration,
    slots: Mutex<HashMap<UserId, Slot>>,
}

impl DashboardCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, user_id: &UserId, now: DateTime<Utc>) -> Slot {
        let mut slots = self.slots.lock().await;
        if !slots.contains_key(user_id) {
            self.evict_expired(&mut slots, now);
        }
        Arc::clone(slots.entry(user_id.clone()).or_default())
    }

    fn is_fresh(&self, cached: &CachedSummary, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(cached.computed_at) < self.ttl
    }

    /// Drop slots nobody is using whose summary is missing or past the TTL.
    fn evict_expired(&self, slots: &mut HashMap<UserId, Slot>, now: DateTime<Utc>) {
        let before = slots.len();
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(entry) => entry.as_ref().is_some_and(|c| self.is_fresh(c, now)),
                Err(_) => true,
            }
        });
        let evicted = before - slots.len();
        if evicted > 0 {
            tracing::debug!(evicted, "dashboard cache evicted expired slots");
        }
    }

    #[cfg(test)]
    async fn slot_count(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Return the cached summary if it is younger than the TTL at `now`,
    /// otherwise run `compute` and cache a successful result.
    ///
    /// # Errors
    ///
    /// Propagates the error of `compute`; failures are not cached.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        compute: F,
    ) -> Result<DashboardSummary, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DashboardSummary, E>>,
    {
        let slot = self.slot(user_id, now).await;
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if self.is_fresh(cached, now) {
                tracing::debug!(user = %user_id, "dashboard cache hit");
                return Ok(cached.summary.clone());
            }
        }

        tracing::debug!(user = %user_id, "dashboard cache miss");
        let summary = compute().await?;
        *entry = Some(CachedSummary {
            summary: summary.clone(),
            computed_at: now,
        });
        Ok(summary)
    }

    pub async fn invalidate(&self, user_id: &UserId) {
        self.slots.lock().await.remove(user_id);
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Builds the student dashboard: resume target, completion counts and streak.
pub struct DashboardService {
    clock: Clock,
    calendar: LocalCalendar,
    progress: Arc<dyn ProgressRepository>,
    cache: DashboardCache,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        calendar: LocalCalendar,
        progress: Arc<dyn ProgressRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            clock,
            calendar,
            progress,
            cache: DashboardCache::new(ttl),
        }
    }

    /// Cached summary for `user_id`.
    ///
    /// Unknown users and an unconfigured backend yield the zero summary.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::StatsUnavailable` if progress cannot be read.
    pub async fn summary(&self, user_id: &UserId) -> Result<DashboardSummary, DashboardError> {
        let now = self.clock.now();
        self.cache
            .get_or_compute(user_id, now, || self.compute(user_id, now))
            .await
    }

    /// Like [`Self::summary`], but fails closed to the zero summary.
    pub async fn summary_or_zero(&self, user_id: &UserId) -> DashboardSummary {
        match self.summary(user_id).await {
            Ok(summary) => summary,
            Err(err) => {
                tracing::warn!(user = %user_id, error = %err, "serving zero dashboard");
                DashboardSummary::zero()
            }
        }
    }

    /// Forget the cached summary so the next read recomputes it.
    pub async fn invalidate(&self, user_id: &UserId) {
        self.cache.invalidate(user_id).await;
    }

    async fn compute(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<DashboardSummary, DashboardError> {
        match self.aggregate(user_id, now).await {
            Err(StorageError::NotConfigured) => Ok(DashboardSummary::zero()),
            other => other.map_err(DashboardError::from),
        }
    }

    async fn aggregate(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<DashboardSummary, StorageError> {
        let continue_watching = self.progress.latest_in_progress(user_id).await?;
        let completed_total = self.progress.count_completed(user_id, None).await?;
        if completed_total == 0 {
            return Ok(DashboardSummary {
                continue_watching,
                ..DashboardSummary::zero()
            });
        }

        let week_start = self.calendar.week_start(now);
        let completed_this_week = self
            .progress
            .count_completed(user_id, Some(week_start))
            .await?;
        let dates = self.progress.completion_dates(user_id, self.calendar).await?;

        Ok(DashboardSummary {
            continue_watching,
            completed_total,
            completed_this_week,
            streak_days: streak_days(&dates),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use edu_core::model::{LessonId, LessonProgress, WatchPercent};
    use edu_core::time::fixed_now;
    use storage::demo::seed_demo_catalog;
    use storage::repository::Storage;

    async fn storage() -> Storage {
        let storage = Storage::in_memory();
        seed_demo_catalog(&storage).await.unwrap();
        storage
    }

    fn service(storage: &Storage, now: DateTime<Utc>) -> DashboardService {
        DashboardService::new(
            Clock::fixed(now),
            LocalCalendar::utc(),
            Arc::clone(&storage.progress),
            Duration::seconds(DEFAULT_CACHE_SECS),
        )
    }

    async fn complete(storage: &Storage, user: &UserId, lesson: &str, at: DateTime<Utc>) {
        let record = LessonProgress::record(
            user.clone(),
            LessonId::new(lesson),
            WatchPercent::COMPLETE,
            true,
            at,
        );
        storage.progress.upsert_progress(&record).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_user_gets_zero_summary() {
        let storage = storage().await;
        let summary = service(&storage, fixed_now())
            .summary(&UserId::new("nobody"))
            .await
            .unwrap();
        assert_eq!(summary, DashboardSummary::zero());
    }

    #[tokio::test]
    async fn mock_backend_gets_zero_summary() {
        let storage = Storage::mock();
        let summary = service(&storage, fixed_now())
            .summary(&UserId::new("u-1"))
            .await
            .unwrap();
        assert_eq!(summary, DashboardSummary::zero());
    }

    #[tokio::test]
    async fn counts_week_and_streak() {
        // fixed_now() is Wednesday 2024-03-13 12:00 UTC.
        let storage = storage().await;
        let user = UserId::new("u-1");
        let now = fixed_now();
        complete(&storage, &user, "lesson-logic-1", now - Duration::days(1)).await;
        complete(&storage, &user, "lesson-logic-2", now - Duration::days(2)).await;
        complete(&storage, &user, "lesson-logic-3", now - Duration::days(3)).await;
        // Thursday of the previous week, with a gap before the run above.
        complete(&storage, &user, "lesson-math-1", now - Duration::days(6)).await;

        let summary = service(&storage, now).summary(&user).await.unwrap();
        assert_eq!(summary.completed_total, 4);
        // Monday 11th and Tuesday 12th.
        assert_eq!(summary.completed_this_week, 2);
        assert_eq!(summary.streak_days, 3);
        assert!(summary.continue_watching.is_none());
    }

    #[tokio::test]
    async fn two_completions_on_one_day_count_once_for_streak() {
        let storage = storage().await;
        let user = UserId::new("u-1");
        let now = fixed_now();
        complete(&storage, &user, "lesson-logic-1", now - Duration::hours(3)).await;
        complete(&storage, &user, "lesson-logic-2", now - Duration::hours(1)).await;

        let summary = service(&storage, now).summary(&user).await.unwrap();
        assert_eq!(summary.completed_total, 2);
        assert_eq!(summary.streak_days, 1);
    }

    #[tokio::test]
    async fn streak_is_relative_to_last_activity() {
        let storage = storage().await;
        let user = UserId::new("u-1");
        let now = fixed_now();
        complete(&storage, &user, "lesson-logic-1", now - Duration::days(10)).await;
        complete(&storage, &user, "lesson-logic-2", now - Duration::days(11)).await;

        let summary = service(&storage, now).summary(&user).await.unwrap();
        assert_eq!(summary.streak_days, 2);
        assert_eq!(summary.completed_this_week, 0);
    }

    #[tokio::test]
    async fn summary_is_cached_until_invalidated() {
        let storage = storage().await;
        let user = UserId::new("u-1");
        let now = fixed_now();
        let dashboard = service(&storage, now);

        assert_eq!(dashboard.summary(&user).await.unwrap().completed_total, 0);
        complete(&storage, &user, "lesson-logic-1", now).await;
        assert_eq!(dashboard.summary(&user).await.unwrap().completed_total, 0);

        dashboard.invalidate(&user).await;
        assert_eq!(dashboard.summary(&user).await.unwrap().completed_total, 1);
    }

    #[tokio::test]
    async fn cache_expires_after_ttl() {
        let cache = DashboardCache::new(Duration::seconds(DEFAULT_CACHE_SECS));
        let user = UserId::new("u-1");
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let compute = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, DashboardError>(DashboardSummary::zero())
        };

        let t0 = fixed_now();
        cache.get_or_compute(&user, t0, compute).await.unwrap();
        cache
            .get_or_compute(&user, t0 + Duration::seconds(59), compute)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache
            .get_or_compute(&user, t0 + Duration::seconds(60), compute)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_slots_are_reclaimed_when_a_new_user_arrives() {
        let cache = DashboardCache::new(Duration::seconds(DEFAULT_CACHE_SECS));
        let compute = || async { Ok::<_, DashboardError>(DashboardSummary::zero()) };
        let t0 = fixed_now();

        cache.get_or_compute(&UserId::new("u-1"), t0, compute).await.unwrap();
        cache
            .get_or_compute(&UserId::new("u-2"), t0 + Duration::seconds(30), compute)
            .await
            .unwrap();
        assert_eq!(cache.slot_count().await, 2);

        // u-1 is past the TTL, u-2 is not.
        cache
            .get_or_compute(&UserId::new("u-3"), t0 + Duration::seconds(75), compute)
            .await
            .unwrap();
        assert_eq!(cache.slot_count().await, 2);
        let slots = cache.slots.lock().await;
        assert!(!slots.contains_key(&UserId::new("u-1")));
        assert!(slots.contains_key(&UserId::new("u-2")));
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = DashboardCache::new(Duration::seconds(DEFAULT_CACHE_SECS));
        let user = UserId::new("u-1");
        let now = fixed_now();

        let failed = cache
            .get_or_compute(&user, now, || async {
                Err::<DashboardSummary, _>(DashboardError::StatsUnavailable(
                    StorageError::Connection("down".into()),
                ))
            })
            .await;
        assert!(failed.is_err());

        let summary = cache
            .get_or_compute(&user, now, || async {
                Ok::<_, DashboardError>(DashboardSummary {
                    completed_total: 5,
                    ..DashboardSummary::zero()
                })
            })
            .await
            .unwrap();
        assert_eq!(summary.completed_total, 5);
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_computation() {
        let cache = Arc::new(DashboardCache::new(Duration::seconds(DEFAULT_CACHE_SECS)));
        let calls = Arc::new(AtomicU32::new(0));
        let user = UserId::new("u-1");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let user = user.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(&user, fixed_now(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, DashboardError>(DashboardSummary::zero())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
