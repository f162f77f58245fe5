//! The dates of one occurrence of a recurring task.

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::RecurrenceError;
use crate::temporal::{parse_timezone, round_days_between, start_of_day};

/// Start, scheduled and due dates of a single occurrence.
///
/// The reference date anchors recurrence computation: it is the due date if
/// set, otherwise the scheduled date, otherwise the start date. When the next
/// occurrence is computed, every other date keeps its distance in days from
/// the reference date, so "starts one week before it is due" survives across
/// occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Occurrence {
    start_date: Option<DateTime<Tz>>,
    scheduled_date: Option<DateTime<Tz>>,
    due_date: Option<DateTime<Tz>>,
    reference_date: Option<DateTime<Tz>>,
}

/// Calendar-day snapshot of an [`Occurrence`], for handing to the task layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OccurrenceDates {
    pub start: Option<NaiveDate>,
    pub scheduled: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
}

impl Occurrence {
    pub fn new(
        start_date: Option<DateTime<Tz>>,
        scheduled_date: Option<DateTime<Tz>>,
        due_date: Option<DateTime<Tz>>,
    ) -> Self {
        let reference_date = due_date.or(scheduled_date).or(start_date);
        Self {
            start_date,
            scheduled_date,
            due_date,
            reference_date,
        }
    }

    /// Build an occurrence from calendar days, each placed at the start of
    /// the day in `timezone`.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidTimezone`] if `timezone` is not a
    /// valid IANA name.
    pub fn from_dates(dates: OccurrenceDates, timezone: &str) -> Result<Self, RecurrenceError> {
        let tz = parse_timezone(timezone)?;
        let at = |d: Option<NaiveDate>| d.map(|d| start_of_day(&tz, d));
        Ok(Self::new(at(dates.start), at(dates.scheduled), at(dates.due)))
    }

    pub fn start_date(&self) -> Option<&DateTime<Tz>> {
        self.start_date.as_ref()
    }

    pub fn scheduled_date(&self) -> Option<&DateTime<Tz>> {
        self.scheduled_date.as_ref()
    }

    pub fn due_date(&self) -> Option<&DateTime<Tz>> {
        self.due_date.as_ref()
    }

    /// Due date, else scheduled date, else start date.
    pub fn reference_date(&self) -> Option<&DateTime<Tz>> {
        self.reference_date.as_ref()
    }

    /// True when no date is set at all.
    pub fn is_empty(&self) -> bool {
        self.reference_date.is_none()
    }

    pub fn dates(&self) -> OccurrenceDates {
        OccurrenceDates {
            start: self.start_date.map(|d| d.date_naive()),
            scheduled: self.scheduled_date.map(|d| d.date_naive()),
            due: self.due_date.map(|d| d.date_naive()),
        }
    }

    /// True if all three dates fall on the same calendar days as `other`'s.
    ///
    /// An unset date only matches another unset date.
    pub fn is_identical_to(&self, other: &Occurrence) -> bool {
        same_day(&self.start_date, &other.start_date)
            && same_day(&self.scheduled_date, &other.scheduled_date)
            && same_day(&self.due_date, &other.due_date)
    }

    /// The occurrence whose reference date is `next_reference_date`, with
    /// every other date at the same day offset as in `self`.
    ///
    /// Without a reference date there is nothing to offset from, and the
    /// result is an empty occurrence.
    pub fn next(&self, next_reference_date: &DateTime<Tz>) -> Occurrence {
        self.next_with(next_reference_date, false)
    }

    /// Like [`next`](Self::next), optionally leaving the scheduled date unset.
    ///
    /// The scheduled date is only dropped when a start or due date remains to
    /// carry the occurrence.
    pub fn next_with(
        &self,
        next_reference_date: &DateTime<Tz>,
        remove_scheduled_date: bool,
    ) -> Occurrence {
        if self.reference_date.is_none() {
            return Occurrence::default();
        }

        let can_remove_scheduled = self.start_date.is_some() || self.due_date.is_some();
        let scheduled_date = if remove_scheduled_date && can_remove_scheduled {
            None
        } else {
            self.next_field_date(self.scheduled_date.as_ref(), next_reference_date)
        };

        Occurrence::new(
            self.next_field_date(self.start_date.as_ref(), next_reference_date),
            scheduled_date,
            self.next_field_date(self.due_date.as_ref(), next_reference_date),
        )
    }

    fn next_field_date(
        &self,
        field_date: Option<&DateTime<Tz>>,
        next_reference_date: &DateTime<Tz>,
    ) -> Option<DateTime<Tz>> {
        let field_date = field_date?;
        let offset_days = self
            .reference_date
            .as_ref()
            .map_or(0, |reference| round_days_between(field_date, reference));

        let tz = next_reference_date.timezone();
        let day = next_reference_date.date_naive() + Duration::days(offset_days);
        Some(start_of_day(&tz, day))
    }
}

fn same_day(a: &Option<DateTime<Tz>>, b: &Option<DateTime<Tz>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.date_naive() == b.date_naive(),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TZ: Tz = chrono_tz::Europe::Berlin;

    fn day(s: &str) -> DateTime<Tz> {
        start_of_day(&TZ, NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    fn naive(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_reference_prefers_due_date() {
        let occurrence = Occurrence::new(
            Some(day("2022-01-01")),
            Some(day("2022-01-02")),
            Some(day("2022-01-03")),
        );
        assert_eq!(occurrence.reference_date(), Some(&day("2022-01-03")));
    }

    #[test]
    fn test_reference_falls_back_to_scheduled_then_start() {
        let scheduled = Occurrence::new(Some(day("2022-01-01")), Some(day("2022-01-02")), None);
        assert_eq!(scheduled.reference_date(), Some(&day("2022-01-02")));

        let start = Occurrence::new(Some(day("2022-01-01")), None, None);
        assert_eq!(start.reference_date(), Some(&day("2022-01-01")));
    }

    #[test]
    fn test_reference_none_when_empty() {
        let occurrence = Occurrence::default();
        assert!(occurrence.reference_date().is_none());
        assert!(occurrence.is_empty());
    }

    #[test]
    fn test_next_keeps_offsets_to_reference() {
        let occurrence = Occurrence::new(
            Some(day("2022-01-04")),
            Some(day("2022-01-06")),
            Some(day("2022-01-10")),
        );
        let next = occurrence.next(&day("2022-01-17"));
        assert_eq!(next.start_date(), Some(&day("2022-01-11")));
        assert_eq!(next.scheduled_date(), Some(&day("2022-01-13")));
        assert_eq!(next.due_date(), Some(&day("2022-01-17")));
        assert_eq!(next.reference_date(), Some(&day("2022-01-17")));
    }

    #[test]
    fn test_next_unset_fields_stay_unset() {
        let occurrence = Occurrence::new(None, Some(day("2022-01-06")), None);
        let next = occurrence.next(&day("2022-02-06"));
        assert!(next.start_date().is_none());
        assert!(next.due_date().is_none());
        assert_eq!(next.scheduled_date(), Some(&day("2022-02-06")));
    }

    #[test]
    fn test_next_without_reference_is_empty() {
        let next = Occurrence::default().next(&day("2022-02-06"));
        assert_eq!(next, Occurrence::default());
    }

    #[test]
    fn test_next_rounds_offset_across_dst() {
        // 2022-03-24 → 2022-03-31 in Berlin is 6 days 23 hours.
        let occurrence = Occurrence::new(Some(day("2022-03-24")), None, Some(day("2022-03-31")));
        let next = occurrence.next(&day("2022-04-07"));
        assert_eq!(next.start_date(), Some(&day("2022-03-31")));
        assert_eq!(next.due_date(), Some(&day("2022-04-07")));
    }

    #[test]
    fn test_next_with_removes_scheduled_when_other_dates_exist() {
        let occurrence = Occurrence::new(None, Some(day("2022-01-08")), Some(day("2022-01-10")));
        let next = occurrence.next_with(&day("2022-01-17"), true);
        assert!(next.scheduled_date().is_none());
        assert_eq!(next.due_date(), Some(&day("2022-01-17")));
    }

    #[test]
    fn test_next_with_keeps_scheduled_when_it_is_the_only_date() {
        let occurrence = Occurrence::new(None, Some(day("2022-01-08")), None);
        let next = occurrence.next_with(&day("2022-01-15"), true);
        assert_eq!(next.scheduled_date(), Some(&day("2022-01-15")));
    }

    #[test]
    fn test_is_identical_to_compares_calendar_days() {
        let a = Occurrence::new(None, None, Some(day("2022-01-10")));
        let later_same_day = day("2022-01-10") + Duration::hours(5);
        let b = Occurrence::new(None, None, Some(later_same_day));
        assert!(a.is_identical_to(&b));
        assert!(b.is_identical_to(&a));
    }

    #[test]
    fn test_is_identical_to_detects_each_field() {
        let base = Occurrence::new(
            Some(day("2022-01-01")),
            Some(day("2022-01-02")),
            Some(day("2022-01-03")),
        );
        assert!(base.is_identical_to(&base.clone()));

        let start = Occurrence::new(None, Some(day("2022-01-02")), Some(day("2022-01-03")));
        let scheduled = Occurrence::new(
            Some(day("2022-01-01")),
            Some(day("2022-01-05")),
            Some(day("2022-01-03")),
        );
        let due = Occurrence::new(Some(day("2022-01-01")), Some(day("2022-01-02")), None);
        assert!(!base.is_identical_to(&start));
        assert!(!base.is_identical_to(&scheduled));
        assert!(!base.is_identical_to(&due));
    }

    #[test]
    fn test_dates_snapshot_and_back() {
        let occurrence = Occurrence::new(Some(day("2022-01-01")), None, Some(day("2022-01-03")));
        let dates = occurrence.dates();
        assert_eq!(dates.start, Some(naive("2022-01-01")));
        assert_eq!(dates.scheduled, None);
        assert_eq!(dates.due, Some(naive("2022-01-03")));

        let rebuilt = Occurrence::from_dates(dates, "Europe/Berlin").unwrap();
        assert_eq!(rebuilt, occurrence);
    }

    #[test]
    fn test_dates_serialize_as_iso_days() {
        let dates = OccurrenceDates {
            start: None,
            scheduled: None,
            due: Some(naive("2022-05-15")),
        };
        let json = serde_json::to_string(&dates).unwrap();
        assert_eq!(json, r#"{"start":null,"scheduled":null,"due":"2022-05-15"}"#);
    }

    #[test]
    fn test_from_dates_invalid_timezone() {
        let result = Occurrence::from_dates(OccurrenceDates::default(), "Nowhere/City");
        assert!(matches!(result, Err(RecurrenceError::InvalidTimezone(_))));
    }
}
