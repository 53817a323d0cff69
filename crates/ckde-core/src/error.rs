//! Error types for compressed density estimation and decoding
//!
//! Provides a unified error type for all ckde crates.

use thiserror::Error;

/// Core error type for density estimation and decoding operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A point, bandwidth or selection does not match the dimensionality of its space
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    /// Invalid parameter provided to a constructor or setter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data (unknown label, out-of-range index, malformed table)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Decoding referenced a channel that was never registered
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// A density or intensity evaluated to a non-finite value
    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for a dimensionality disagreement
    pub fn dimension_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::DimensionMismatch {
            expected,
            actual,
            context: context.to_string(),
        }
    }

    /// Create an error for an invalid parameter
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::NumericDegeneracy(format!("{context} contains NaN or infinite values"))
    }

    /// Check that `actual` matches `expected`
    pub fn check_dimension(expected: usize, actual: usize, context: &str) -> Result<()> {
        if expected != actual {
            return Err(Self::dimension_mismatch(expected, actual, context));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::dimension_mismatch(2, 3, "mixture evaluation");
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in mixture evaluation: expected 2, got 3"
        );

        let err = Error::InvalidParameter("bandwidth must be positive".to_string());
        assert_eq!(err.to_string(), "Invalid parameter: bandwidth must be positive");

        let err = Error::InvalidInput("unknown label 'D'".to_string());
        assert_eq!(err.to_string(), "Invalid input: unknown label 'D'");

        let err = Error::UnknownChannel("tt3_7".to_string());
        assert_eq!(err.to_string(), "Unknown channel: tt3_7");

        let err = Error::NumericDegeneracy("intensity".to_string());
        assert_eq!(err.to_string(), "Numeric degeneracy: intensity");
    }

    #[test]
    fn test_error_helper_functions() {
        match Error::dimension_mismatch(1, 4, "grid") {
            Error::DimensionMismatch {
                expected,
                actual,
                context,
            } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 4);
                assert_eq!(context, "grid");
            }
            _ => panic!("Wrong error type"),
        }

        let err = Error::non_finite("log posterior");
        assert_eq!(
            err.to_string(),
            "Numeric degeneracy: log posterior contains NaN or infinite values"
        );

        let err = Error::invalid_parameter(format!("rate {} is negative", -1.0));
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_check_dimension() {
        assert!(Error::check_dimension(3, 3, "point").is_ok());
        let err = Error::check_dimension(3, 2, "point").unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2, .. }));
    }
}
