use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, UserId};
use crate::model::lesson::lesson_href;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("watch percent must be between 0 and 100, got {0}")]
    WatchPercentOutOfRange(f64),
}

/// Share of a lesson video that has been watched, 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WatchPercent(u8);

impl WatchPercent {
    pub const COMPLETE: WatchPercent = WatchPercent(100);

    /// Build from a (possibly fractional) percentage, rounding to the nearest whole percent.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::WatchPercentOutOfRange` for values outside 0..=100 or NaN.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(value: f64) -> Result<Self, ProgressError> {
        if !(0.0..=100.0).contains(&value) {
            return Err(ProgressError::WatchPercentOutOfRange(value));
        }
        Ok(Self(value.round() as u8))
    }

    /// # Errors
    ///
    /// Returns `ProgressError::WatchPercentOutOfRange` for values above 100.
    pub fn from_u8(value: u8) -> Result<Self, ProgressError> {
        if value > 100 {
            return Err(ProgressError::WatchPercentOutOfRange(f64::from(value)));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 >= 100
    }
}

/// Per-user, per-lesson watch state. One record per (user, lesson).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub watch_percent: WatchPercent,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LessonProgress {
    /// Build the record a progress report should upsert.
    ///
    /// The caller decides completion: marking `completed` stamps `now`,
    /// any report without it clears a previous completion.
    #[must_use]
    pub fn record(
        user_id: UserId,
        lesson_id: LessonId,
        watch_percent: WatchPercent,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            lesson_id,
            watch_percent,
            completed_at: completed.then_some(now),
            updated_at: now,
        }
    }

    /// Still worth resuming: never completed, or not watched to the end.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.completed_at.is_none() || !self.watch_percent.is_complete()
    }
}

//
// ─── DASHBOARD ─────────────────────────────────────────────────────────────────
//

/// The lesson a student should resume, resolved with display titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueWatchingItem {
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub lesson_title: String,
    pub course_title: String,
    pub watch_percent: WatchPercent,
    pub href: String,
}

impl ContinueWatchingItem {
    #[must_use]
    pub fn new(
        lesson_id: LessonId,
        course_id: CourseId,
        lesson_title: String,
        course_title: String,
        watch_percent: WatchPercent,
    ) -> Self {
        let href = lesson_href(&course_id, &lesson_id);
        Self {
            lesson_id,
            course_id,
            lesson_title,
            course_title,
            watch_percent,
            href,
        }
    }
}

/// Derived student dashboard numbers. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub continue_watching: Option<ContinueWatchingItem>,
    pub completed_total: u32,
    pub completed_this_week: u32,
    pub streak_days: u32,
}

impl DashboardSummary {
    /// The summary shown when nothing is known about the user.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }
}
