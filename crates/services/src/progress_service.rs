use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use edu_core::Clock;
use edu_core::model::{LessonId, LessonProgress, UserId, WatchPercent};
use storage::repository::{CatalogRepository, ProgressRepository};

use crate::dashboard_service::DashboardService;
use crate::error::ServiceError;

/// What a lesson page needs to resume playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub watch_percent: u8,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A watch report from the lesson player.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub lesson_id: LessonId,
    pub watch_percent: f64,
    pub completed: bool,
}

/// Records lesson progress and keeps the dashboard cache honest.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
    dashboard: Arc<DashboardService>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        progress: Arc<dyn ProgressRepository>,
        dashboard: Arc<DashboardService>,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress,
            dashboard,
        }
    }

    /// Stored progress for a lesson; zero and no completion when none exists.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotConfigured` on the demo backend, or
    /// `ServiceError::Storage` if the record cannot be read.
    pub async fn get(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<ProgressView, ServiceError> {
        let record = self.progress.get_progress(user_id, lesson_id).await?;
        Ok(match record {
            Some(record) => ProgressView {
                watch_percent: record.watch_percent.value(),
                completed_at: record.completed_at,
            },
            None => ProgressView {
                watch_percent: 0,
                completed_at: None,
            },
        })
    }

    /// Upsert progress for (user, lesson) and drop the user's cached dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidInput` for a percentage outside 0..=100,
    /// `ServiceError::NotFound` for an unknown lesson, or
    /// `ServiceError::NotConfigured` on the demo backend.
    pub async fn record(
        &self,
        user_id: &UserId,
        report: ProgressReport,
    ) -> Result<LessonProgress, ServiceError> {
        let percent = WatchPercent::new(report.watch_percent).map_err(ServiceError::invalid)?;
        if self.catalog.get_lesson(&report.lesson_id).await?.is_none() {
            return Err(ServiceError::NotFound("lesson"));
        }

        let record = LessonProgress::record(
            user_id.clone(),
            report.lesson_id,
            percent,
            report.completed,
            self.clock.now(),
        );
        self.progress
            .upsert_progress(&record)
            .await
            .map_err(ServiceError::storage("lesson"))?;
        self.dashboard.invalidate(user_id).await;

        tracing::debug!(
            user = %user_id,
            lesson = %record.lesson_id,
            percent = record.watch_percent.value(),
            completed = report.completed,
            "progress recorded"
        );
        Ok(record)
    }
}
