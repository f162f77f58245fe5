//! Engine configuration.
//!
//! [`EngineConfig`] is plain data with serde defaults, so a host can load it
//! from JSON and override only the fields it cares about.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{RecurrenceError, Result};

/// Day counts used by the spaced-repetition rule, indexed by repetition.
pub const DEFAULT_SPACED_SCHEDULE: [u32; 3] = [1, 3, 10];

/// Upper bound on backward steps taken by the month/year overflow correction.
pub const DEFAULT_MAX_CORRECTION_STEPS: usize = 1000;

/// Which day begins a week for interval counting in weekly rules.
///
/// With an interval above one, `"every 4 weeks on Sunday"` counts weeks from
/// the week containing the anchor date, so the week boundary decides whether
/// the first Sunday after the anchor belongs to week zero or week one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStartDay {
    /// ISO 8601 standard.
    Monday,
    /// US/Canada convention.
    #[default]
    Sunday,
}

impl WeekStartDay {
    pub(crate) fn weekday(self) -> Weekday {
        match self {
            WeekStartDay::Monday => Weekday::Mon,
            WeekStartDay::Sunday => Weekday::Sun,
        }
    }
}

/// Tunables for a [`RecurrenceEngine`](crate::engine::RecurrenceEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Days until the next occurrence for each spaced repetition. A rule whose
    /// repetition runs past the end of this table has no next occurrence.
    pub spaced_schedule: Vec<u32>,
    /// Week boundary handed to the calendar evaluator.
    pub week_start: WeekStartDay,
    /// Hard cap on overflow-correction steps before giving up with
    /// [`RecurrenceError::CorrectionDiverged`].
    pub max_correction_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spaced_schedule: DEFAULT_SPACED_SCHEDULE.to_vec(),
            week_start: WeekStartDay::default(),
            max_correction_steps: DEFAULT_MAX_CORRECTION_STEPS,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidConfig`] if the JSON is malformed or
    /// a value is out of range.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| RecurrenceError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.max_correction_steps == 0 {
            return Err(RecurrenceError::InvalidConfig(
                "max_correction_steps must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.spaced_schedule, vec![1, 3, 10]);
        assert_eq!(config.week_start, WeekStartDay::Sunday);
        assert_eq!(config.max_correction_steps, 1000);
    }

    #[test]
    fn test_from_json_partial_override() {
        let config = EngineConfig::from_json(r#"{"spaced_schedule": [2, 5]}"#).unwrap();
        assert_eq!(config.spaced_schedule, vec![2, 5]);
        assert_eq!(config.week_start, WeekStartDay::Sunday);
        assert_eq!(config.max_correction_steps, 1000);
    }

    #[test]
    fn test_from_json_week_start() {
        let config = EngineConfig::from_json(r#"{"week_start": "monday"}"#).unwrap();
        assert_eq!(config.week_start, WeekStartDay::Monday);
        assert_eq!(config.week_start.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_from_json_rejects_zero_step_cap() {
        let err = EngineConfig::from_json(r#"{"max_correction_steps": 0}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"), "got: {err}");
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let result = EngineConfig::from_json("{not json");
        assert!(matches!(result, Err(RecurrenceError::InvalidConfig(_))));
    }
}
