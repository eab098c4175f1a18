use thiserror::Error;

/// Raised by the input normalizer; a schedule is never computed from input
/// that produced one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} must be a number, got {value:?}")]
    NotNumeric { field: &'static str, value: String },

    #[error("{field} must be > 0")]
    NotPositive { field: &'static str },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{field} must be one of {allowed}, got {value}")]
    NotAllowed {
        field: &'static str,
        allowed: &'static str,
        value: String,
    },

    #[error(
        "fixedTenureMonths must be a whole number of months between {min} and {max}, got {value}"
    )]
    TenureOutOfRange { min: u32, max: u32, value: f64 },
}

pub type ValidationResult<T> = Result<T, ValidationError>;
