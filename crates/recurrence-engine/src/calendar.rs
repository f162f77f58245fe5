//! Calendar rules: structured options and the evaluator that expands them.
//!
//! [`CalendarOptions`] is the parsed form of rule text such as
//! `"every 2 weeks on Monday and Wednesday"`. Expanding options into concrete
//! dates is the job of a [`CalendarEvaluator`]; the default
//! [`RRuleEvaluator`] hands the work to the `rrule` crate (RFC 5545).
//!
//! Evaluation is timezone-naive. Instants passed to and returned from the
//! evaluator are local wall-clock values stored as UTC (see
//! [`temporal`](crate::temporal)).

use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::WeekStartDay;
use crate::error::{RecurrenceError, Result};
use crate::temporal::{end_of_day_utc, start_of_day_utc};

/// How often a calendar rule repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn unit(self) -> &'static str {
        match self {
            Frequency::Daily => "day",
            Frequency::Weekly => "week",
            Frequency::Monthly => "month",
            Frequency::Yearly => "year",
        }
    }
}

/// A weekday constraint: every such weekday, or the n-th one in the month
/// (negative counts from the end, so `-1` is the last).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekdayPin {
    Every(Weekday),
    Nth(i16, Weekday),
}

/// Parsed calendar recurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarOptions {
    pub frequency: Frequency,
    /// Repeat every `interval` units of `frequency`. Always at least 1.
    pub interval: u16,
    pub by_weekday: Vec<WeekdayPin>,
    /// Days of the month, 1..=31, or -1 for the last day.
    pub by_month_day: Vec<i8>,
    /// Stop after this many occurrences, counted from `dt_start`.
    pub count: Option<u32>,
    /// Last day an occurrence may fall on.
    pub until: Option<NaiveDate>,
    /// First day of the recurrence. Defaults for unset weekday and month-day
    /// constraints are taken from it, as is the phase of the interval.
    pub dt_start: Option<NaiveDate>,
}

impl CalendarOptions {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            by_weekday: Vec::new(),
            by_month_day: Vec::new(),
            count: None,
            until: None,
            dt_start: None,
        }
    }

    pub fn interval(mut self, interval: u16) -> Self {
        self.interval = interval.max(1);
        self
    }

    pub fn by_weekday(mut self, pins: Vec<WeekdayPin>) -> Self {
        self.by_weekday = pins;
        self
    }

    pub fn by_month_day(mut self, days: Vec<i8>) -> Self {
        self.by_month_day = days;
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    /// A copy of these options starting on `day`.
    pub fn anchored_at(&self, day: NaiveDate) -> Self {
        Self {
            dt_start: Some(day),
            ..self.clone()
        }
    }

    /// True if the rule names explicit days (`"... on Monday"`,
    /// `"... on the 31st"`) rather than inheriting them from the start date.
    pub fn pins_day(&self) -> bool {
        !self.by_weekday.is_empty() || !self.by_month_day.is_empty()
    }
}

/// Expands [`CalendarOptions`] into concrete dates.
pub trait CalendarEvaluator: fmt::Debug + Send + Sync {
    /// The earliest occurrence strictly after `after`, or `None` once a
    /// count or until bound is exhausted.
    ///
    /// A rule without `dt_start` starts on the calendar day of `after`.
    fn after(&self, options: &CalendarOptions, after: DateTime<Utc>)
        -> Result<Option<DateTime<Utc>>>;

    /// Human-readable rule text, e.g. `"every 2 weeks on Sunday"`.
    ///
    /// Intervals render as `"every N <unit>s"` and explicit day pins are
    /// introduced by `" on "`.
    fn to_text(&self, options: &CalendarOptions) -> String {
        render_text(options)
    }
}

// ── RRuleEvaluator ──────────────────────────────────────────────────────────

/// [`CalendarEvaluator`] backed by the `rrule` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RRuleEvaluator {
    week_start: WeekStartDay,
}

impl RRuleEvaluator {
    pub fn new(week_start: WeekStartDay) -> Self {
        Self { week_start }
    }

    fn build(&self, options: &CalendarOptions, dt_start: NaiveDate) -> Result<rrule::RRuleSet> {
        let dt_start = rrule::Tz::UTC.from_utc_datetime(&start_of_day_utc(dt_start).naive_utc());

        let mut rule = rrule::RRule::new(to_rrule_frequency(options.frequency))
            .interval(options.interval)
            .week_start(self.week_start.weekday());
        if !options.by_weekday.is_empty() {
            rule = rule.by_weekday(options.by_weekday.iter().map(to_rrule_weekday).collect());
        }
        if !options.by_month_day.is_empty() {
            rule = rule.by_month_day(options.by_month_day.clone());
        }
        if let Some(count) = options.count {
            rule = rule.count(count);
        }
        if let Some(until) = options.until {
            let until = rrule::Tz::UTC.from_utc_datetime(&end_of_day_utc(until).naive_utc());
            rule = rule.until(until);
        }

        rule.build(dt_start)
            .map_err(|e| RecurrenceError::Evaluation(format!("'{}': {}", render_text(options), e)))
    }
}

impl CalendarEvaluator for RRuleEvaluator {
    fn after(
        &self,
        options: &CalendarOptions,
        after: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let dt_start = options.dt_start.unwrap_or_else(|| after.date_naive());
        // rrule rejects an until before the start; such a rule has simply ended.
        if options.until.is_some_and(|until| until < dt_start) {
            return Ok(None);
        }
        let set = self.build(options, dt_start)?;
        let after = rrule::Tz::UTC.from_utc_datetime(&after.naive_utc());

        // Iteration begins at dt_start, which is never far before `after`.
        Ok((&set)
            .into_iter()
            .find(|candidate| *candidate > after)
            .map(|candidate| candidate.with_timezone(&Utc)))
    }
}

fn to_rrule_frequency(frequency: Frequency) -> rrule::Frequency {
    match frequency {
        Frequency::Daily => rrule::Frequency::Daily,
        Frequency::Weekly => rrule::Frequency::Weekly,
        Frequency::Monthly => rrule::Frequency::Monthly,
        Frequency::Yearly => rrule::Frequency::Yearly,
    }
}

fn to_rrule_weekday(pin: &WeekdayPin) -> rrule::NWeekday {
    match *pin {
        WeekdayPin::Every(weekday) => rrule::NWeekday::Every(weekday),
        WeekdayPin::Nth(n, weekday) => rrule::NWeekday::Nth(n, weekday),
    }
}

// ── Text rendering ──────────────────────────────────────────────────────────

const WORKWEEK: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Render options in the grammar accepted by
/// [`CalendarTextParser`](crate::text::CalendarTextParser).
pub fn render_text(options: &CalendarOptions) -> String {
    let mut text = String::from("every");

    if is_every_weekday(options) {
        text.push_str(" weekday");
    } else {
        let unit = options.frequency.unit();
        if options.interval == 1 {
            text.push_str(&format!(" {unit}"));
        } else {
            text.push_str(&format!(" {} {unit}s", options.interval));
        }

        if !options.by_weekday.is_empty() {
            let days: Vec<String> = options.by_weekday.iter().map(weekday_pin_name).collect();
            let on_the = options
                .by_weekday
                .iter()
                .any(|pin| matches!(pin, WeekdayPin::Nth(..)));
            text.push_str(if on_the { " on the " } else { " on " });
            text.push_str(&join_list(&days));
        } else if !options.by_month_day.is_empty() {
            let days: Vec<String> = options
                .by_month_day
                .iter()
                .map(|&d| month_day_name(d))
                .collect();
            text.push_str(" on the ");
            text.push_str(&join_list(&days));
        }
    }

    if let Some(count) = options.count {
        let noun = if count == 1 { "time" } else { "times" };
        text.push_str(&format!(" for {count} {noun}"));
    }
    if let Some(until) = options.until {
        text.push_str(&format!(" until {}", until.format("%B %-d, %Y")));
    }
    text
}

fn is_every_weekday(options: &CalendarOptions) -> bool {
    options.frequency == Frequency::Weekly
        && options.interval == 1
        && options.by_weekday.len() == WORKWEEK.len()
        && WORKWEEK
            .iter()
            .all(|wd| options.by_weekday.contains(&WeekdayPin::Every(*wd)))
}

fn weekday_pin_name(pin: &WeekdayPin) -> String {
    match *pin {
        WeekdayPin::Every(weekday) => weekday_name(weekday).to_string(),
        WeekdayPin::Nth(-1, weekday) => format!("last {}", weekday_name(weekday)),
        WeekdayPin::Nth(n, weekday) => format!("{} {}", ordinal(i32::from(n)), weekday_name(weekday)),
    }
}

fn month_day_name(day: i8) -> String {
    if day == -1 {
        "last day".to_string()
    } else {
        ordinal(i32::from(day))
    }
}

pub(crate) fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// 1 → "1st", 2 → "2nd", 11 → "11th", 23 → "23rd".
fn ordinal(n: i32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// "a", "a and b", "a, b and c".
fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
