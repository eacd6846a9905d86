//! Validation errors for participant input.

use thiserror::Error;

/// Malformed or out-of-range input.
///
/// Always recoverable: the conversation re-prompts the same step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Category is not one of the fixed enumeration.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Rate type is not hourly, shift or fixed.
    #[error("unknown rate type: {0}")]
    UnknownRateType(String),

    /// Request mode is not auction or catalog.
    #[error("unknown request mode: {0}")]
    UnknownMode(String),

    /// Role is not client, executor or admin.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// Input could not be parsed as a number.
    #[error("not a number: {0}")]
    NotANumber(String),

    /// Numeric value outside the accepted interval.
    #[error("{field} must be in ({min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Empty value where one is required.
    #[error("{0} cannot be empty")]
    Empty(&'static str),
}
