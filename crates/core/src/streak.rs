use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

/// Number of consecutive calendar days, ending at the most recent date in
/// `dates`, on which at least one completion happened.
///
/// The count is anchored at the latest activity, not at today: a learner who
/// stopped a week ago still reports the streak they earned back then.
/// Input order does not matter and repeated dates count once.
///
/// # Examples
///
/// ```
/// # use chrono::NaiveDate;
/// # use edu_core::streak::streak_days;
/// let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
/// assert_eq!(streak_days(&[d(13), d(12), d(12), d(9)]), 2);
/// assert_eq!(streak_days(&[]), 0);
/// ```
#[must_use]
pub fn streak_days(dates: &[NaiveDate]) -> u32 {
    let present: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    let Some(&latest) = present.last() else {
        return 0;
    };

    let mut streak = 0;
    let mut day = latest;
    while present.contains(&day) {
        streak += 1;
        match day.checked_sub_signed(Duration::days(1)) {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}
