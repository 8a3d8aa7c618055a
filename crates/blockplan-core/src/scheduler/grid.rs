//! 15-minute grid arithmetic.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::calendar::MINUTES_PER_DAY;

/// Slot granularity in minutes.
pub const GRID_MINUTES: u32 = 15;

/// First grid tick at or after `now`, in minutes since midnight of
/// `now`'s date. Returns 1440 when no tick is left that day.
///
/// Seconds count: 07:00:00 stays 07:00, 07:00:01 becomes 07:15.
pub fn next_tick(now: NaiveDateTime) -> u32 {
    let seconds = now.num_seconds_from_midnight();
    let grid_seconds = GRID_MINUTES * 60;
    let ticks = seconds.div_ceil(grid_seconds);
    (ticks * GRID_MINUTES).min(MINUTES_PER_DAY)
}

/// Round a minute value up to the grid.
pub fn align_up(minute: u32) -> u32 {
    minute.div_ceil(GRID_MINUTES) * GRID_MINUTES
}

/// Round a duration up to whole grid steps, at least one step.
pub fn round_duration(minutes: u32) -> u32 {
    align_up(minutes).max(GRID_MINUTES)
}

/// Datetime of `minute` on `date`. 1440 maps to the next midnight.
pub fn at_minute(date: NaiveDate, minute: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + chrono::Duration::minutes(i64::from(minute))
}
