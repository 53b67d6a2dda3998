//! Clock-time helpers for recordings and timers.

use chrono::{DateTime, Local, LocalResult, NaiveDate, Offset, TimeDelta, TimeZone};

/// Splits an `"HH:MM"` value on its first colon.
///
/// Returns `None` when there is no colon, either side is not an integer,
/// or the values are not a valid time of day.
#[must_use]
pub fn parse_clock_time(value: &str) -> Option<(u32, u32)> {
    let (hour, minute) = value.split_once(':')?;
    let hour: u32 = hour.trim().parse().ok()?;
    let minute: u32 = minute.trim().parse().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

/// Returns the unix timestamp of `date` at `hour:minute:00` in `tz`.
///
/// During a DST fold the earlier instant wins. A time inside a DST gap is
/// read with the offset in force before the gap, so it moves forward by
/// the length of the gap.
#[must_use]
pub fn local_timestamp<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    hour: u32,
    minute: u32,
) -> Option<i64> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Some(t.timestamp()),
        LocalResult::None => {
            let before = naive.checked_sub_signed(TimeDelta::hours(3))?;
            let offset = tz.offset_from_local_datetime(&before).earliest()?.fix();
            offset
                .from_local_datetime(&naive)
                .single()
                .map(|t| t.timestamp())
        }
    }
}

/// Resolves an `"HH:MM"` value against the calendar date of `now` shifted
/// by `days_back` days.
#[must_use]
pub fn clock_time_on_day(value: &str, now: &DateTime<Local>, days_back: u64) -> Option<i64> {
    let (hour, minute) = parse_clock_time(value)?;
    let date = now
        .date_naive()
        .checked_sub_days(chrono::Days::new(days_back))?;
    local_timestamp(&Local, date, hour, minute)
}
