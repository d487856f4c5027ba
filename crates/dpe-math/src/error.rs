//! Domain errors raised by the numeric kernels.
//!
//! Every variant is recoverable by the caller supplying corrected input.
//! Kernels never clamp an out-of-range value into range.

use thiserror::Error;

/// Result type alias for the numeric kernels.
pub type Result<T> = std::result::Result<T, DomainError>;

/// A numeric input outside its valid domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("{field} must be a number, got NaN")]
    NotANumber { field: &'static str },

    #[error("{field} must be in [0, 1], got {value}")]
    OutOfUnitInterval { field: &'static str, value: f64 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error(
        "negative likelihood ratio is undefined for a test with specificity 0 (sensitivity {sensitivity})"
    )]
    DegenerateNegativeRatio { sensitivity: f64 },

    #[error("thresholds must satisfy 0 <= test ({test}) < treatment ({treatment}) <= 1")]
    UnorderedThresholds { test: f64, treatment: f64 },

    #[error("probability {prior} is certain and cannot be moved to {target} by a likelihood ratio")]
    Unreachable { prior: f64, target: f64 },
}

impl DomainError {
    /// Name of the offending input, when the error concerns a single field.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DomainError::NotANumber { field }
            | DomainError::OutOfUnitInterval { field, .. }
            | DomainError::Negative { field, .. } => Some(field),
            DomainError::DegenerateNegativeRatio { .. } => Some("specificity"),
            DomainError::UnorderedThresholds { .. } => Some("thresholds"),
            DomainError::Unreachable { .. } => None,
        }
    }
}
