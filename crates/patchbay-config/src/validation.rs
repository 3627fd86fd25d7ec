//! Range checks for engine settings.
//!
//! Every field of an [`EngineConfig`](crate::EngineConfig) is checked and all
//! problems are reported together, so a hand-edited file can be fixed in one
//! pass.

use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Numeric value outside its allowed range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the setting.
        field: String,
        /// The rejected value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value of the right type that still makes no sense.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Name of the setting.
        field: String,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Collects errors across several checks.
#[derive(Debug, Default)]
pub(crate) struct Checker {
    errors: Vec<ValidationError>,
}

impl Checker {
    pub(crate) fn range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.errors.push(ValidationError::OutOfRange {
                field: field.to_string(),
                value,
                min,
                max,
            });
        }
    }

    pub(crate) fn require(&mut self, ok: bool, field: &str, reason: impl Into<String>) {
        if !ok {
            self.errors.push(ValidationError::InvalidValue {
                field: field.to_string(),
                reason: reason.into(),
            });
        }
    }

    /// `Ok` if nothing failed, the lone error, or all of them.
    pub(crate) fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_checker_passes() {
        assert_eq!(Checker::default().finish(), Ok(()));
    }

    #[test]
    fn test_nan_is_out_of_range() {
        let mut checker = Checker::default();
        checker.range("gain", f64::NAN, -1.0, 1.0);
        assert!(matches!(
            checker.finish(),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "gain"
        ));
    }

    #[test]
    fn test_errors_are_joined() {
        let mut checker = Checker::default();
        checker.range("a", 5.0, 0.0, 1.0);
        checker.require(false, "b", "must be set");
        let err = checker.finish().unwrap_err();
        assert_eq!(
            err.to_string(),
            "'a' value 5 out of range [0, 1]; invalid value for 'b': must be set"
        );
    }
}
