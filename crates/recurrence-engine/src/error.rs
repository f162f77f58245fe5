//! Error types for recurrence-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Overflow correction for '{rule}' did not settle after {steps} steps")]
    CorrectionDiverged { rule: String, steps: usize },
}

pub type Result<T> = std::result::Result<T, RecurrenceError>;
