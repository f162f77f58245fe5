//! Recurrence rules: calendar-based or spaced repetition.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::calendar::{CalendarEvaluator, CalendarOptions, Frequency};
use crate::error::Result;

/// The text form of a spaced-repetition rule starts with this keyword.
pub const SPACED_KEYWORD: &str = "spaced";

/// Parsed rule text, before an evaluator or schedule is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOptions {
    Calendar(CalendarOptions),
    Spaced { repetition: usize },
}

/// A rule that answers "when is the next occurrence after this instant?".
///
/// Instants are local wall-clock values stored as UTC; see
/// [`temporal`](crate::temporal).
#[derive(Debug, Clone)]
pub enum RecurrenceRule {
    Calendar(CalendarRule),
    Spaced(SpacedRule),
}

/// Calendar options paired with the evaluator that expands them.
#[derive(Debug, Clone)]
pub struct CalendarRule {
    options: CalendarOptions,
    evaluator: Arc<dyn CalendarEvaluator>,
}

/// Spaced repetition: the gap before the next occurrence grows with each
/// completion, following a fixed schedule of day counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpacedRule {
    repetition: usize,
    schedule: Arc<[u32]>,
}

/// Frequency and interval of a calendar rule that may need overflow
/// correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OverflowGuard {
    pub frequency: Frequency,
    pub interval: u16,
}

impl RecurrenceRule {
    pub fn calendar(options: CalendarOptions, evaluator: Arc<dyn CalendarEvaluator>) -> Self {
        RecurrenceRule::Calendar(CalendarRule { options, evaluator })
    }

    pub fn spaced(repetition: usize, schedule: impl Into<Arc<[u32]>>) -> Self {
        RecurrenceRule::Spaced(SpacedRule {
            repetition,
            schedule: schedule.into(),
        })
    }

    /// The next occurrence strictly after `instant`, or `None` if the rule
    /// has run out of occurrences.
    pub fn after(&self, instant: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        match self {
            RecurrenceRule::Calendar(rule) => rule.evaluator.after(&rule.options, instant),
            RecurrenceRule::Spaced(rule) => Ok(rule.after(instant)),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            RecurrenceRule::Calendar(rule) => rule.evaluator.to_text(&rule.options),
            RecurrenceRule::Spaced(rule) => rule.to_text(),
        }
    }

    /// The rule to carry into the following occurrence.
    ///
    /// Only spaced rules advance; calendar rules return `None` because their
    /// progress lives entirely in the dates.
    pub fn next_iteration(&self) -> Option<RecurrenceRule> {
        match self {
            RecurrenceRule::Calendar(_) => None,
            RecurrenceRule::Spaced(rule) => Some(RecurrenceRule::Spaced(SpacedRule {
                repetition: rule.repetition + 1,
                schedule: Arc::clone(&rule.schedule),
            })),
        }
    }

    /// A copy of this rule whose recurrence starts on `day`. Spaced rules
    /// have no start anchor and are returned unchanged.
    pub fn anchored_at(&self, day: NaiveDate) -> RecurrenceRule {
        match self {
            RecurrenceRule::Calendar(rule) => RecurrenceRule::Calendar(CalendarRule {
                options: rule.options.anchored_at(day),
                evaluator: Arc::clone(&rule.evaluator),
            }),
            RecurrenceRule::Spaced(_) => self.clone(),
        }
    }

    pub fn calendar_options(&self) -> Option<&CalendarOptions> {
        match self {
            RecurrenceRule::Calendar(rule) => Some(&rule.options),
            RecurrenceRule::Spaced(_) => None,
        }
    }

    /// Monthly and yearly calendar rules can jump an extra period when the
    /// target month lacks the start date's day (the 31st, February 29th).
    /// Monthly rules that name their days explicitly are left alone.
    pub(crate) fn overflow_guard(&self) -> Option<OverflowGuard> {
        let options = self.calendar_options()?;
        let guarded = match options.frequency {
            Frequency::Monthly => !options.pins_day(),
            Frequency::Yearly => true,
            Frequency::Daily | Frequency::Weekly => false,
        };
        guarded.then_some(OverflowGuard {
            frequency: options.frequency,
            interval: options.interval,
        })
    }
}

impl OverflowGuard {
    /// True if `next` lies more than `interval` months (or years) after
    /// `after`. Days within the month are ignored.
    pub(crate) fn overshoots(&self, after: NaiveDate, next: NaiveDate) -> bool {
        let years = i64::from(next.year()) - i64::from(after.year());
        let distance = match self.frequency {
            Frequency::Yearly => years,
            _ => i64::from(next.month()) - i64::from(after.month()) + 12 * years,
        };
        distance > i64::from(self.interval)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl CalendarRule {
    pub fn options(&self) -> &CalendarOptions {
        &self.options
    }
}

impl SpacedRule {
    pub fn repetition(&self) -> usize {
        self.repetition
    }

    fn after(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = self.schedule.get(self.repetition)?;
        Some(instant + Duration::days(i64::from(*days)))
    }

    fn to_text(&self) -> String {
        if self.repetition == 0 {
            SPACED_KEYWORD.to_string()
        } else {
            format!("{SPACED_KEYWORD}{}", self.repetition)
        }
    }
}
