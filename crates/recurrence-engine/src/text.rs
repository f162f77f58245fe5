//! Rule-text front-end.
//!
//! Turns text such as `"every 2 weeks on Monday and Wednesday when done"`
//! into [`RuleOptions`] in two stages:
//!
//! 1. [`split_when_done`] separates the `" when done"` suffix, which selects
//!    completion-based rather than schedule-based recurrence.
//! 2. An ordered list of [`RuleTextParser`]s is tried against the remainder;
//!    the first that recognises it wins.
//!
//! # Supported Calendar Text
//!
//! **Frequencies**: `"every day"`, `"every 3 days"`, `"every other week"`,
//! `"every month"`, `"every 2 years"`
//!
//! **Weekdays**: `"every weekday"`, `"every Tuesday"`,
//! `"every Monday, Wednesday and Friday"`, `"every 4 weeks on Sunday"`
//!
//! **Days of the month**: `"every month on the 31st"`,
//! `"every month on the 1st and 15th"`, `"every month on the last day"`,
//! `"every month on the 2nd Tuesday"`, `"every month on the last Friday"`
//!
//! **Bounds**: `"every day for 3 times"`, `"every week until January 1, 2023"`
//!
//! Matching is case-insensitive. Anything else is rejected rather than
//! guessed at.

use std::fmt;

use chrono::{NaiveDate, Weekday};

use crate::calendar::{CalendarOptions, Frequency, WeekdayPin};
use crate::rule::{RuleOptions, SPACED_KEYWORD};

/// Suffix marking a rule as based on the completion day.
pub const WHEN_DONE_SUFFIX: &str = " when done";

/// One strategy for recognising rule text.
pub trait RuleTextParser: fmt::Debug + Send + Sync {
    /// Parse `text` (already stripped of `" when done"`), or return `None` if
    /// this parser does not recognise it.
    fn try_parse(&self, text: &str) -> Option<RuleOptions>;
}

/// Split rule text into the rule itself and whether it ends in
/// `" when done"`.
///
/// Returns `None` for empty text or text containing anything other than
/// ASCII letters, digits, spaces, commas and `!`.
pub fn split_when_done(text: &str) -> Option<(&str, bool)> {
    let text = text.trim();
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, ' ' | ',' | '!');
    if text.is_empty() || !text.chars().all(allowed) {
        return None;
    }

    // ASCII-only from here on, so byte slicing is safe.
    let split = text.len().checked_sub(WHEN_DONE_SUFFIX.len());
    let (rule, base_on_today) = match split {
        Some(at) if text[at..].eq_ignore_ascii_case(WHEN_DONE_SUFFIX) => (text[..at].trim(), true),
        _ => (text, false),
    };

    if rule.is_empty() {
        None
    } else {
        Some((rule, base_on_today))
    }
}

/// The parsers a default engine tries, in order.
pub fn default_parsers() -> Vec<Box<dyn RuleTextParser>> {
    vec![Box::new(SpacedTextParser), Box::new(CalendarTextParser)]
}

// ── SpacedTextParser ────────────────────────────────────────────────────────

/// Recognises `"spaced"`, optionally followed by the starting repetition
/// (`"spaced2"`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedTextParser;

impl RuleTextParser for SpacedTextParser {
    fn try_parse(&self, text: &str) -> Option<RuleOptions> {
        let normalized = text.trim().to_ascii_lowercase();
        let rest = normalized.strip_prefix(SPACED_KEYWORD)?;
        let repetition = if rest.is_empty() {
            0
        } else if rest.bytes().all(|b| b.is_ascii_digit()) {
            rest.parse().ok()?
        } else {
            return None;
        };
        Some(RuleOptions::Spaced { repetition })
    }
}

// ── CalendarTextParser ──────────────────────────────────────────────────────

/// Recognises the calendar grammar described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarTextParser;

impl RuleTextParser for CalendarTextParser {
    fn try_parse(&self, text: &str) -> Option<RuleOptions> {
        parse_calendar_text(text).map(RuleOptions::Calendar)
    }
}

/// Parse calendar rule text into options without a start anchor.
pub fn parse_calendar_text(text: &str) -> Option<CalendarOptions> {
    let normalized = normalize(text);
    let rest = normalized.strip_prefix("every ")?;

    let (rest, until) = match rest.split_once(" until ") {
        Some((head, date)) => (head, Some(parse_until(date)?)),
        None => (rest, None),
    };
    let (rest, count) = match rest.split_once(" for ") {
        Some((head, times)) => (head, Some(parse_count(times)?)),
        None => (rest, None),
    };
    let (head, pins) = match rest.split_once(" on ") {
        Some((head, pins)) => (head, Some(pins)),
        None => (rest, None),
    };

    let mut options = parse_head(head)?;
    if let Some(pins) = pins {
        apply_pins(&mut options, pins)?;
    }
    options.count = count;
    options.until = until;
    Some(options)
}

/// Lowercase and collapse runs of whitespace.
fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `"day"`, `"3 days"`, `"other week"`, `"weekday"`, `"tuesday"`,
/// `"monday, wednesday and friday"`.
fn parse_head(head: &str) -> Option<CalendarOptions> {
    if head == "weekday" {
        let workweek = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ];
        return Some(
            CalendarOptions::new(Frequency::Weekly)
                .by_weekday(workweek.into_iter().map(WeekdayPin::Every).collect()),
        );
    }

    let parts: Vec<&str> = head.split(' ').collect();
    match parts.as_slice() {
        [unit] => {
            if let Some(frequency) = parse_unit(unit) {
                return Some(CalendarOptions::new(frequency));
            }
        }
        ["other", unit] => {
            return Some(CalendarOptions::new(parse_unit(unit)?).interval(2));
        }
        [n, unit] if n.bytes().all(|b| b.is_ascii_digit()) => {
            let interval: u16 = n.parse().ok()?;
            if interval == 0 {
                return None;
            }
            return Some(CalendarOptions::new(parse_unit(unit)?).interval(interval));
        }
        _ => {}
    }

    let weekdays = parse_weekday_list(head)?;
    Some(
        CalendarOptions::new(Frequency::Weekly)
            .by_weekday(weekdays.into_iter().map(WeekdayPin::Every).collect()),
    )
}

/// Apply the text after `" on "` to options parsed from the head.
fn apply_pins(options: &mut CalendarOptions, pins: &str) -> Option<()> {
    if options.pins_day() {
        return None;
    }

    match options.frequency {
        Frequency::Weekly => {
            let weekdays = parse_weekday_list(pins)?;
            options.by_weekday = weekdays.into_iter().map(WeekdayPin::Every).collect();
        }
        Frequency::Monthly => {
            let items = split_list(pins.strip_prefix("the ")?);
            let mut month_days = Vec::new();
            let mut weekdays = Vec::new();
            for item in &items {
                match parse_month_pin(item)? {
                    MonthPin::Day(day) => month_days.push(day),
                    MonthPin::Weekday(pin) => weekdays.push(pin),
                }
            }
            // Days of the month and n-th weekdays cannot be mixed in one rule.
            if !month_days.is_empty() && !weekdays.is_empty() {
                return None;
            }
            options.by_month_day = month_days;
            options.by_weekday = weekdays;
        }
        Frequency::Daily | Frequency::Yearly => return None,
    }
    Some(())
}

enum MonthPin {
    Day(i8),
    Weekday(WeekdayPin),
}

/// `"31st"`, `"last day"`, `"2nd tuesday"`, `"last friday"`.
fn parse_month_pin(item: &str) -> Option<MonthPin> {
    let parts: Vec<&str> = item.split(' ').collect();
    match parts.as_slice() {
        ["last", "day"] => Some(MonthPin::Day(-1)),
        [ordinal] => {
            let day = parse_ordinal(ordinal)?;
            if (1..=31).contains(&day) {
                Some(MonthPin::Day(day as i8))
            } else {
                None
            }
        }
        [ordinal, weekday] => {
            let n = parse_ordinal(ordinal)?;
            if !(n == -1 || (1..=5).contains(&n)) {
                return None;
            }
            Some(MonthPin::Weekday(WeekdayPin::Nth(
                n as i16,
                parse_weekday(weekday)?,
            )))
        }
        _ => None,
    }
}

/// `"3 times"` or `"1 time"`.
fn parse_count(s: &str) -> Option<u32> {
    let parts: Vec<&str> = s.split(' ').collect();
    match parts.as_slice() {
        [n, "times" | "time"] => n.parse().ok().filter(|&n| n > 0),
        _ => None,
    }
}

/// `"january 1, 2023"` or `"2023-01-01"`.
fn parse_until(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    let cleaned = s.replace(',', " ");
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    match parts.as_slice() {
        [month, day, year] => {
            NaiveDate::from_ymd_opt(year.parse().ok()?, parse_month(month)?, day.parse().ok()?)
        }
        _ => None,
    }
}

fn parse_unit(s: &str) -> Option<Frequency> {
    match s {
        "day" | "days" => Some(Frequency::Daily),
        "week" | "weeks" => Some(Frequency::Weekly),
        "month" | "months" => Some(Frequency::Monthly),
        "year" | "years" => Some(Frequency::Yearly),
        _ => None,
    }
}

/// Split `"a, b and c"` into its items.
fn split_list(s: &str) -> Vec<String> {
    s.replace(" and ", ",")
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_weekday_list(s: &str) -> Option<Vec<Weekday>> {
    let items = split_list(s);
    if items.is_empty() {
        return None;
    }
    let mut weekdays = Vec::with_capacity(items.len());
    for item in &items {
        let weekday = parse_weekday(item).or_else(|| parse_weekday(item.strip_suffix('s')?))?;
        if !weekdays.contains(&weekday) {
            weekdays.push(weekday);
        }
    }
    Some(weekdays)
}

// ── Parsing helpers ─────────────────────────────────────────────────────────

/// Parse a weekday name (lowercase, full or abbreviated).
fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parse a month name to number (1-12).
fn parse_month(s: &str) -> Option<u32> {
    match s {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" | "sept" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

/// Parse an ordinal: "first"→1, "2nd"→2, "31st"→31, "last"→-1.
///
/// Numeric ordinals need a suffix but any of st/nd/rd/th is accepted.
fn parse_ordinal(s: &str) -> Option<i32> {
    match s {
        "first" => Some(1),
        "second" => Some(2),
        "third" => Some(3),
        "fourth" => Some(4),
        "fifth" => Some(5),
        "last" => Some(-1),
        _ => {
            let digits = s.find(|c: char| !c.is_ascii_digit())?;
            let (number, suffix) = s.split_at(digits);
            if number.is_empty() || !matches!(suffix, "st" | "nd" | "rd" | "th") {
                return None;
            }
            number.parse().ok()
        }
    }
}
