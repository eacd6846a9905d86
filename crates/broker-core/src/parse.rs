//! Numeric input parsing for radius and rate prompts.

use crate::error::ValidationError;

/// Upper bound accepted by [`parse_positive_decimal`].
pub const MAX_DECIMAL_INPUT: f64 = 1000.0;

/// Parse a positive decimal in `(0, 1000]`.
///
/// A comma decimal separator is normalised to a dot first, so `"50,5"`
/// reads as `50.5`. `field` names the value in the returned error.
pub fn parse_positive_decimal(text: &str, field: &'static str) -> Result<f64, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }

    let normalised = trimmed.replace(',', ".");
    let value: f64 = normalised
        .parse()
        .map_err(|_| ValidationError::NotANumber(trimmed.to_string()))?;

    if !value.is_finite() {
        return Err(ValidationError::NotANumber(trimmed.to_string()));
    }

    if value <= 0.0 || value > MAX_DECIMAL_INPUT {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: MAX_DECIMAL_INPUT,
        });
    }

    Ok(value)
}
