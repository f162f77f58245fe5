//! Computing the next occurrence of a recurring task.
//!
//! A [`Recurrence`] pairs a rule with the dates of the current occurrence.
//! Two modes exist:
//!
//! - **Schedule-based** (`"every month"`): the next occurrence follows the
//!   current reference date, regardless of when the task was completed.
//! - **When done** (`"every month when done"`): the next occurrence follows
//!   the completion day.
//!
//! Monthly and yearly rules are corrected so that a task due on a day the
//! target month lacks (January 31st, February 29th) lands on the last
//! possible day instead of skipping a whole period.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::config::DEFAULT_MAX_CORRECTION_STEPS;
use crate::engine::RecurrenceEngine;
use crate::error::{RecurrenceError, Result};
use crate::occurrence::Occurrence;
use crate::rule::{OverflowGuard, RecurrenceRule};
use crate::temporal::{end_of_day_utc, to_local_start_of_day};
use crate::text::WHEN_DONE_SUFFIX;

/// Options for [`Recurrence::next_with_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NextOptions {
    /// Leave the scheduled date unset on the next occurrence, as long as a
    /// start or due date remains.
    pub remove_scheduled_date: bool,
}

#[derive(Debug, Clone)]
pub struct Recurrence {
    rule: RecurrenceRule,
    base_on_today: bool,
    occurrence: Occurrence,
    max_correction_steps: usize,
}

impl Recurrence {
    pub fn new(rule: RecurrenceRule, base_on_today: bool, occurrence: Occurrence) -> Self {
        Self {
            rule,
            base_on_today,
            occurrence,
            max_correction_steps: DEFAULT_MAX_CORRECTION_STEPS,
        }
    }

    /// Cap on the day-by-day steps taken while correcting month or year
    /// overflow. Exceeding it is reported as
    /// [`RecurrenceError::CorrectionDiverged`].
    pub fn with_max_correction_steps(mut self, steps: usize) -> Self {
        self.max_correction_steps = steps;
        self
    }

    /// Parse `text` with a default [`RecurrenceEngine`].
    ///
    /// Returns `None` for text that is not (yet) a valid rule.
    ///
    /// # Examples
    ///
    /// ```
    /// use recurrence_engine::{Occurrence, Recurrence};
    ///
    /// let recurrence = Recurrence::from_text("every 2 weeks when done", Occurrence::default());
    /// assert_eq!(recurrence.unwrap().to_text(), "every 2 weeks when done");
    ///
    /// assert!(Recurrence::from_text("every fortnight", Occurrence::default()).is_none());
    /// ```
    pub fn from_text(text: &str, occurrence: Occurrence) -> Option<Recurrence> {
        RecurrenceEngine::default().from_text(text, occurrence)
    }

    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    /// True for `" when done"` rules.
    pub fn base_on_today(&self) -> bool {
        self.base_on_today
    }

    pub fn occurrence(&self) -> &Occurrence {
        &self.occurrence
    }

    pub fn max_correction_steps(&self) -> usize {
        self.max_correction_steps
    }

    pub fn to_text(&self) -> String {
        let mut text = self.rule.to_text();
        if self.base_on_today {
            text.push_str(WHEN_DONE_SUFFIX);
        }
        text
    }

    /// True if both recurrences have the same mode, occurrences on the same
    /// days, and the same rule text.
    pub fn identical_to(&self, other: &Recurrence) -> bool {
        self.base_on_today == other.base_on_today
            && self.occurrence.is_identical_to(&other.occurrence)
            && self.to_text() == other.to_text()
    }

    /// The dates of the occurrence following the current one.
    ///
    /// Every date of the current occurrence keeps its day offset from the
    /// reference date. If the current occurrence has no dates at all the
    /// result is an occurrence with no dates.
    ///
    /// # Arguments
    ///
    /// * `completion` - When the current occurrence was completed. Only its
    ///   calendar day matters. It anchors `" when done"` rules and stands in
    ///   for a missing reference date.
    ///
    /// # Returns
    ///
    /// `Ok(None)` once the rule is exhausted (`for N times`, `until ...`, or
    /// the end of a spaced-repetition schedule).
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::Evaluation`] if the calendar evaluator
    /// rejects the rule, or [`RecurrenceError::CorrectionDiverged`] if
    /// overflow correction does not settle.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use recurrence_engine::temporal::start_of_day;
    /// use recurrence_engine::{Occurrence, Recurrence};
    ///
    /// let tz = chrono_tz::Europe::Berlin;
    /// let day = |d| start_of_day(&tz, NaiveDate::from_ymd_opt(2022, 4, d).unwrap());
    ///
    /// let occurrence = Occurrence::new(None, None, Some(day(17)));
    /// let recurrence = Recurrence::from_text("every 4 weeks on Sunday when done", occurrence).unwrap();
    ///
    /// // Completed on Tuesday, 2022-04-19.
    /// let next = recurrence.next(&day(19)).unwrap().unwrap();
    /// assert_eq!(
    ///     next.due_date().unwrap().date_naive(),
    ///     NaiveDate::from_ymd_opt(2022, 5, 15).unwrap()
    /// );
    /// ```
    pub fn next(&self, completion: &DateTime<Tz>) -> Result<Option<Occurrence>> {
        self.next_with_options(completion, &NextOptions::default())
    }

    /// Like [`next`](Self::next), with [`NextOptions`].
    pub fn next_with_options(
        &self,
        completion: &DateTime<Tz>,
        options: &NextOptions,
    ) -> Result<Option<Occurrence>> {
        let Some(next_reference) = self.next_reference_date(completion)? else {
            tracing::debug!(rule = %self.rule, "recurrence exhausted");
            return Ok(None);
        };
        Ok(Some(
            self.occurrence
                .next_with(&next_reference, options.remove_scheduled_date),
        ))
    }

    /// [`next`](Self::next), completed now in `timezone`.
    pub fn next_from_now(&self, timezone: &Tz) -> Result<Option<Occurrence>> {
        self.next(&Utc::now().with_timezone(timezone))
    }

    /// The recurrence carried by the follow-up task: the next occurrence,
    /// with the rule advanced to match.
    ///
    /// Spaced-repetition rules move on to the next gap. Schedule-based
    /// calendar rules restart from the new reference date.
    ///
    /// # Errors
    ///
    /// Same as [`next`](Self::next).
    pub fn advance(&self, completion: &DateTime<Tz>) -> Result<Option<Recurrence>> {
        let Some(occurrence) = self.next(completion)? else {
            return Ok(None);
        };

        let mut rule = self
            .rule
            .next_iteration()
            .unwrap_or_else(|| self.rule.clone());
        if !self.base_on_today {
            if let Some(reference) = occurrence.reference_date() {
                rule = rule.anchored_at(reference.date_naive());
            }
        }

        Ok(Some(Recurrence {
            rule,
            base_on_today: self.base_on_today,
            occurrence,
            max_correction_steps: self.max_correction_steps,
        }))
    }

    // ── Next reference date ─────────────────────────────────────────────────

    /// Start of the day the next occurrence is anchored to.
    ///
    /// The result lives in the current reference date's timezone, or the
    /// completion's timezone when there is no reference date.
    fn next_reference_date(&self, completion: &DateTime<Tz>) -> Result<Option<DateTime<Tz>>> {
        let reference = self.occurrence.reference_date();
        let tz = reference.map_or(completion.timezone(), |r| r.timezone());

        let next = if self.base_on_today {
            let today = completion.date_naive();
            self.next_after(today, &self.rule.anchored_at(today))?
        } else {
            let after_day = reference.unwrap_or(completion).date_naive();
            self.next_after(after_day, &self.rule)?
        };

        Ok(next.map(|wall_clock| to_local_start_of_day(wall_clock, &tz)))
    }

    /// The first occurrence of `rule` on a day after `after_day`, corrected
    /// for month and year overflow. Values are wall-clock times forced to
    /// UTC.
    fn next_after(
        &self,
        after_day: NaiveDate,
        rule: &RecurrenceRule,
    ) -> Result<Option<DateTime<Utc>>> {
        let Some(next) = rule.after(end_of_day_utc(after_day))? else {
            return Ok(None);
        };

        match rule.overflow_guard() {
            Some(guard) => self.correct_overflow(guard, after_day, next, rule),
            None => Ok(Some(next)),
        }
    }

    /// Move the anchor one day into the past until the next occurrence is no
    /// more than one interval away.
    ///
    /// Starting from January 31st, "every month" first yields March 31st.
    /// Anchoring at January 30th and 29th still skips February; January 28th
    /// yields February 28th.
    fn correct_overflow(
        &self,
        guard: OverflowGuard,
        after_day: NaiveDate,
        mut next: DateTime<Utc>,
        rule: &RecurrenceRule,
    ) -> Result<Option<DateTime<Utc>>> {
        let mut day = after_day;
        let mut steps = 0;

        while guard.overshoots(day, next.date_naive()) {
            if steps >= self.max_correction_steps {
                tracing::warn!(
                    rule = %rule,
                    steps,
                    "overflow correction did not settle"
                );
                return Err(RecurrenceError::CorrectionDiverged {
                    rule: rule.to_text(),
                    steps,
                });
            }
            steps += 1;

            day = day.pred_opt().ok_or_else(|| {
                RecurrenceError::Evaluation(format!("no day before {day} for '{rule}'"))
            })?;
            match rule.anchored_at(day).after(end_of_day_utc(day))? {
                Some(candidate) => next = candidate,
                None => return Ok(None),
            }
        }

        if steps > 0 {
            tracing::debug!(
                rule = %rule,
                from = %after_day,
                anchor = %day,
                next = %next.date_naive(),
                steps,
                "corrected month/year overflow"
            );
        }
        Ok(Some(next))
    }
}
