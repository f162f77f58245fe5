//! Day-boundary arithmetic shared by the occurrence and recurrence logic.
//!
//! Every date the engine produces is "midnight, local time". Two
//! representations are used:
//!
//! - `DateTime<Tz>`: a real instant in the user's timezone. Used for the
//!   fields of an [`Occurrence`](crate::occurrence::Occurrence).
//! - `DateTime<Utc>` holding a *local wall-clock* value ("forced to UTC").
//!   Calendar evaluation is timezone-naive, so local dates are reinterpreted
//!   as UTC before evaluation and reinterpreted back afterwards. This keeps
//!   DST offsets from shifting a computed date across midnight.
//!
//! All functions are pure and take explicit inputs; nothing here reads the
//! system clock.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::RecurrenceError;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz, RecurrenceError> {
    s.parse::<Tz>()
        .map_err(|_| RecurrenceError::InvalidTimezone(format!("'{}'", s)))
}

/// The first instant of `date` in `tz`.
///
/// Usually local midnight. In zones where DST starts at midnight (so 00:00
/// does not exist on that day) this is the first whole hour that does exist.
pub fn start_of_day(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .unwrap_or_else(|| local_noon(tz, date))
}

/// Local noon on `date` in `tz`.
///
/// No timezone database transition happens at noon, so this always resolves
/// to a single instant on the intended calendar day.
pub fn local_noon(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN) + Duration::hours(12);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// Midnight of `date` as a wall-clock value forced to UTC.
pub fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// The last millisecond of `date` as a wall-clock value forced to UTC.
///
/// Used as the exclusive search anchor: anything strictly after it falls on
/// a later calendar day.
pub fn end_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::milliseconds(1);
    Utc.from_utc_datetime(&naive)
}

/// Reinterpret a forced-to-UTC wall-clock value as a local date in `tz` and
/// return the start of that day.
///
/// The calendar day is read at noon, not midnight. Converting a UTC midnight
/// straight to local time on the day DST begins can land on the previous day.
pub fn to_local_start_of_day(wall_clock: DateTime<Utc>, tz: &Tz) -> DateTime<Tz> {
    let noon = local_noon(tz, wall_clock.date_naive());
    start_of_day(tz, noon.date_naive())
}

/// Whole days from `earlier` to `later`, rounded to the nearest day.
///
/// A span across a DST change is 23 or 25 hours per day boundary; rounding
/// absorbs that instead of truncating to the wrong day.
pub fn round_days_between<A: TimeZone, B: TimeZone>(
    later: &DateTime<A>,
    earlier: &DateTime<B>,
) -> i64 {
    let span = later.with_timezone(&Utc) - earlier.with_timezone(&Utc);
    (span.num_seconds() as f64 / SECONDS_PER_DAY).round() as i64
}
