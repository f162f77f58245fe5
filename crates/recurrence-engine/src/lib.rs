//! # recurrence-engine
//!
//! Next-occurrence computation for recurring tasks.
//!
//! Given a rule such as `"every month"`, `"every 2 weeks on Sunday when done"`
//! or `"spaced"`, and the start, scheduled and due dates of the current
//! occurrence, the engine computes the dates of the next occurrence. Day
//! offsets between the dates are preserved, months that lack the due day
//! resolve to their last day, and DST transitions never shift a date.
//!
//! ## Modules
//!
//! - [`engine`]: rule text → [`Recurrence`], with injectable parsers and evaluator
//! - [`recurrence`]: next-occurrence computation and overflow correction
//! - [`rule`]: calendar and spaced-repetition rules
//! - [`calendar`]: calendar rule options, evaluation (`rrule`) and rendering
//! - [`text`]: the rule-text grammar
//! - [`occurrence`]: the dates of a single occurrence
//! - [`temporal`]: day-boundary and timezone arithmetic
//! - [`config`]: engine configuration
//! - [`error`]: error types

pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod occurrence;
pub mod recurrence;
pub mod rule;
pub mod temporal;
pub mod text;

pub use calendar::{CalendarEvaluator, CalendarOptions, Frequency, RRuleEvaluator, WeekdayPin};
pub use config::{EngineConfig, WeekStartDay};
pub use engine::RecurrenceEngine;
pub use error::RecurrenceError;
pub use occurrence::{Occurrence, OccurrenceDates};
pub use recurrence::{NextOptions, Recurrence};
pub use rule::{RecurrenceRule, RuleOptions};
pub use text::{split_when_done, RuleTextParser};
