//! Validation error types

use std::fmt;

/// Validation error for book fields
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is empty (or whitespace only) when it shouldn't be
    Empty { field: &'static str },

    /// Field is shorter than its minimum length
    TooShort { field: &'static str, min: usize },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// Field contains a NUL character
    InvalidCharacter { field: &'static str },

    /// Numeric field outside its inclusive range
    OutOfRange {
        field: &'static str,
        min: String,
        max: String,
        value: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooShort { field, min } => {
                write!(f, "{} must be at least {} characters", field, min)
            }
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidCharacter { field } => write!(f, "{} must not contain NUL characters", field),
            Self::OutOfRange {
                field,
                min,
                max,
                value,
            } => write!(f, "{} must be between {} and {} (got {})", field, min, max, value),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a string's length in characters against an inclusive range.
///
/// NUL is rejected: SQLite's `length()` stops counting at it.
pub(crate) fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.contains('\0') {
        return Err(ValidationError::InvalidCharacter { field });
    }

    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max });
    }

    Ok(())
}

/// Check a numeric value against an inclusive range. NaN is always out of range.
pub(crate) fn check_range<T>(field: &'static str, value: T, min: T, max: T) -> Result<(), ValidationError>
where
    T: PartialOrd + fmt::Display + Copy,
{
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: min.to_string(),
            max: max.to_string(),
            value: value.to_string(),
        })
    }
}
