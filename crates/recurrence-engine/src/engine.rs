//! Builds [`Recurrence`] values from rule text.
//!
//! The engine owns every capability a recurrence needs: the ordered list of
//! rule-text parsers, the calendar evaluator, and the configuration. Nothing
//! is global; two engines with different configurations can coexist.

use std::sync::Arc;

use crate::calendar::{CalendarEvaluator, RRuleEvaluator};
use crate::config::EngineConfig;
use crate::error::{RecurrenceError, Result};
use crate::occurrence::Occurrence;
use crate::recurrence::Recurrence;
use crate::rule::{RecurrenceRule, RuleOptions};
use crate::text::{default_parsers, split_when_done, RuleTextParser};

#[derive(Debug)]
pub struct RecurrenceEngine {
    parsers: Vec<Box<dyn RuleTextParser>>,
    evaluator: Arc<dyn CalendarEvaluator>,
    spaced_schedule: Arc<[u32]>,
    config: EngineConfig,
}

impl Default for RecurrenceEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl RecurrenceEngine {
    /// An engine with the default parsers and the `rrule`-backed evaluator.
    pub fn new(config: EngineConfig) -> Self {
        let evaluator = Arc::new(RRuleEvaluator::new(config.week_start));
        Self::with_parts(config, default_parsers(), evaluator)
    }

    /// An engine with caller-supplied parsers (tried in order) and evaluator.
    pub fn with_parts(
        config: EngineConfig,
        parsers: Vec<Box<dyn RuleTextParser>>,
        evaluator: Arc<dyn CalendarEvaluator>,
    ) -> Self {
        Self {
            parsers,
            evaluator,
            spaced_schedule: config.spaced_schedule.clone().into(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse rule text without a `" when done"` suffix into a rule.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidRule`] if no parser recognises the
    /// text.
    pub fn parse_rule(&self, text: &str) -> Result<RecurrenceRule> {
        let options = self
            .parsers
            .iter()
            .find_map(|parser| parser.try_parse(text))
            .ok_or_else(|| {
                RecurrenceError::InvalidRule(format!("cannot parse rule: '{}'", text.trim()))
            })?;

        Ok(match options {
            RuleOptions::Calendar(options) => {
                RecurrenceRule::calendar(options, Arc::clone(&self.evaluator))
            }
            RuleOptions::Spaced { repetition } => {
                RecurrenceRule::spaced(repetition, Arc::clone(&self.spaced_schedule))
            }
        })
    }

    /// Build a recurrence from rule text and the dates of the current
    /// occurrence.
    ///
    /// Schedule-based calendar rules start on the occurrence's reference
    /// date. Rules ending in `" when done"` are anchored later, on the day
    /// each occurrence is completed.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidRule`] if the text is empty,
    /// contains unsupported characters, or matches no parser.
    pub fn try_from_text(&self, text: &str, occurrence: Occurrence) -> Result<Recurrence> {
        let (rule_text, base_on_today) = split_when_done(text).ok_or_else(|| {
            RecurrenceError::InvalidRule(format!("unsupported rule text: '{}'", text.trim()))
        })?;

        let mut rule = self.parse_rule(rule_text)?;
        if !base_on_today {
            if let Some(reference) = occurrence.reference_date() {
                rule = rule.anchored_at(reference.date_naive());
            }
        }

        Ok(Recurrence::new(rule, base_on_today, occurrence)
            .with_max_correction_steps(self.config.max_correction_steps))
    }

    /// Like [`try_from_text`](Self::try_from_text), but treats unparseable
    /// text as "not a recurrence yet" (the user may still be typing).
    pub fn from_text(&self, text: &str, occurrence: Occurrence) -> Option<Recurrence> {
        match self.try_from_text(text, occurrence) {
            Ok(recurrence) => Some(recurrence),
            Err(e) => {
                tracing::debug!(text, error = %e, "ignoring unparseable recurrence rule");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeekStartDay;
    use crate::rule::RuleOptions;
    use crate::temporal::start_of_day;
    use chrono::NaiveDate;

    #[derive(Debug)]
    struct FixedText(&'static str);

    impl RuleTextParser for FixedText {
        fn try_parse(&self, text: &str) -> Option<RuleOptions> {
            (text == self.0).then_some(RuleOptions::Spaced { repetition: 2 })
        }
    }

    fn due(date: &str) -> Occurrence {
        let tz = chrono_tz::UTC;
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Occurrence::new(None, None, Some(start_of_day(&tz, day)))
    }

    #[test]
    fn test_parse_rule_calendar() {
        let engine = RecurrenceEngine::default();
        assert_eq!(engine.parse_rule("every 2 weeks").unwrap().to_text(), "every 2 weeks");
    }

    #[test]
    fn test_parse_rule_spaced() {
        let engine = RecurrenceEngine::default();
        assert_eq!(engine.parse_rule("spaced1").unwrap().to_text(), "spaced1");
    }

    #[test]
    fn test_parse_rule_unknown() {
        let engine = RecurrenceEngine::default();
        let err = engine.parse_rule("whenever").unwrap_err().to_string();
        assert!(err.contains("Invalid recurrence rule"), "got: {err}");
    }

    #[test]
    fn test_try_from_text_anchors_schedule_based_rules() {
        let engine = RecurrenceEngine::default();
        let recurrence = engine.try_from_text("every month", due("2022-01-31")).unwrap();
        let options = recurrence.rule().calendar_options().unwrap();
        assert_eq!(options.dt_start, NaiveDate::from_ymd_opt(2022, 1, 31));
        assert!(!recurrence.base_on_today());
    }

    #[test]
    fn test_try_from_text_leaves_when_done_rules_unanchored() {
        let engine = RecurrenceEngine::default();
        let recurrence = engine
            .try_from_text("every month when done", due("2022-01-31"))
            .unwrap();
        assert_eq!(recurrence.rule().calendar_options().unwrap().dt_start, None);
        assert!(recurrence.base_on_today());
    }

    #[test]
    fn test_from_text_invalid_is_none() {
        let engine = RecurrenceEngine::default();
        assert!(engine.from_text("every month on the 32nd", due("2022-01-31")).is_none());
        assert!(engine.from_text("every", Occurrence::default()).is_none());
        assert!(engine.from_text("every day; rm", Occurrence::default()).is_none());
    }

    #[test]
    fn test_parsers_are_tried_in_order() {
        let parsers: Vec<Box<dyn RuleTextParser>> =
            vec![Box::new(FixedText("every day")), Box::new(crate::text::CalendarTextParser)];
        let engine = RecurrenceEngine::with_parts(
            EngineConfig::default(),
            parsers,
            Arc::new(RRuleEvaluator::default()),
        );
        assert_eq!(engine.parse_rule("every day").unwrap().to_text(), "spaced2");
        assert_eq!(engine.parse_rule("every week").unwrap().to_text(), "every week");
        assert!(engine.parse_rule("spaced").is_err());
    }

    #[test]
    fn test_config_carries_through() {
        let config = EngineConfig {
            week_start: WeekStartDay::Monday,
            max_correction_steps: 5,
            ..EngineConfig::default()
        };
        let engine = RecurrenceEngine::new(config.clone());
        assert_eq!(engine.config(), &config);
    }
}
