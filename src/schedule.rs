//! Biweekly schedule gate
//!
//! A date is a release day when the number of whole weeks elapsed since the
//! epoch is even. Weeks are counted with floor division so dates before the
//! epoch follow the same 14-day period.

use chrono::{Days, NaiveDate};

/// Length of one sprint in days
pub const CYCLE_DAYS: i64 = 14;

/// Whole weeks between `epoch` and `today` (negative before the epoch)
pub fn weeks_since(today: NaiveDate, epoch: NaiveDate) -> i64 {
    (today - epoch).num_days().div_euclid(7)
}

/// Whether `today` falls in a release week
pub fn is_release_day(today: NaiveDate, epoch: NaiveDate) -> bool {
    weeks_since(today, epoch).rem_euclid(2) == 0
}

/// The next `count` cycle start dates on or after `from`
///
/// A cycle starts on the epoch and every 14 days before or after it.
pub fn upcoming_cycle_starts(from: NaiveDate, epoch: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let elapsed = (from - epoch).num_days();
    let mut cycles = elapsed.div_euclid(CYCLE_DAYS);
    if elapsed.rem_euclid(CYCLE_DAYS) != 0 {
        cycles += 1;
    }

    (0..count)
        .filter_map(|i| {
            let offset = (cycles + i64::try_from(i).ok()?) * CYCLE_DAYS;
            shift(epoch, offset)
        })
        .collect()
}

fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    }
}
