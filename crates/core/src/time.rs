use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// The calendar used for "local" day and week boundaries.
///
/// Completion timestamps are stored in UTC; dashboards bucket them into
/// calendar days and Monday-based weeks of a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalCalendar {
    offset: FixedOffset,
}

impl Default for LocalCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl LocalCalendar {
    #[must_use]
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Calendar for the host's current UTC offset.
    #[must_use]
    pub fn host() -> Self {
        Self {
            offset: *Local::now().offset(),
        }
    }

    /// Calendar for an offset east of UTC, in minutes.
    ///
    /// Returns `None` when the offset is out of range (more than a day).
    #[must_use]
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        let secs = minutes.checked_mul(60)?;
        FixedOffset::east_opt(secs).map(|offset| Self { offset })
    }

    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Offset in minutes east of UTC.
    #[must_use]
    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// The local calendar date a UTC instant falls on.
    #[must_use]
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Start of the week (Monday 00:00 local) containing `now`, as a UTC instant.
    ///
    /// Sunday counts as day 7, so on a Sunday the week started six days earlier.
    #[must_use]
    pub fn week_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.local_date(now);
        let days_since_monday = i64::from(today.weekday().number_from_monday()) - 1;
        let monday = today - Duration::days(days_since_monday);
        self.start_of_day(monday)
    }

    /// Local midnight of `date`, as a UTC instant.
    #[must_use]
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        // Fixed offsets have no gaps, so the local time always maps to one instant.
        (midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()))).and_utc()
    }
}

/// Deterministic timestamp for tests and examples (Wednesday 2024-03-13T12:00:00Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_710_331_200;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
