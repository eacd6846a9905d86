//! Input validation for admin-provisioned executor fields.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid handle format.
    InvalidHandle(String),
    /// Invalid category tag.
    InvalidTag(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidHandle(msg) => write!(f, "Invalid handle: {}", msg),
            ValidationError::InvalidTag(msg) => write!(f, "Invalid category tag: {}", msg),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum handle length accepted by the channel.
pub const MAX_HANDLE_LENGTH: usize = 32;

/// Minimum handle length accepted by the channel.
pub const MIN_HANDLE_LENGTH: usize = 3;

/// Maximum city name length.
pub const MAX_CITY_LENGTH: usize = 100;

/// Maximum length of a single category tag.
pub const MAX_TAG_LENGTH: usize = 64;

/// Validate a handle (with or without the leading `@`).
///
/// Handles are 3-32 characters of ASCII letters, digits and underscores.
pub fn validate_handle(handle: &str) -> Result<(), ValidationError> {
    let handle = handle.trim().trim_start_matches('@');

    if handle.is_empty() {
        return Err(ValidationError::Empty("handle".to_string()));
    }

    let len = handle.chars().count();
    if len > MAX_HANDLE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "handle".to_string(),
            max: MAX_HANDLE_LENGTH,
            actual: len,
        });
    }

    if len < MIN_HANDLE_LENGTH {
        return Err(ValidationError::InvalidHandle(format!(
            "must be at least {} characters",
            MIN_HANDLE_LENGTH
        )));
    }

    if let Some(c) = handle
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(ValidationError::InvalidHandle(format!(
            "invalid character '{}'",
            c
        )));
    }

    Ok(())
}

/// Validate a city name length.
pub fn validate_city(city: &str) -> Result<(), ValidationError> {
    let len = city.trim().chars().count();
    if len > MAX_CITY_LENGTH {
        return Err(ValidationError::TooLong {
            field: "city".to_string(),
            max: MAX_CITY_LENGTH,
            actual: len,
        });
    }
    Ok(())
}

/// Validate a category tag list: at least one tag, no blanks, no separators.
pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.is_empty() {
        return Err(ValidationError::Empty("categories".to_string()));
    }

    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty("category tag".to_string()));
        }
        if trimmed.contains(',') {
            return Err(ValidationError::InvalidTag(format!(
                "'{}' contains a comma",
                trimmed
            )));
        }
        let len = trimmed.chars().count();
        if len > MAX_TAG_LENGTH {
            return Err(ValidationError::TooLong {
                field: "category tag".to_string(),
                max: MAX_TAG_LENGTH,
                actual: len,
            });
        }
    }

    Ok(())
}
