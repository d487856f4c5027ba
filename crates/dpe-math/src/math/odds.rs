//! Probability <-> odds conversion.
//!
//! Odds are `p / (1 - p)`. Certainty (`p = 1`) maps to [`CERTAIN_ODDS`],
//! which is `f64::INFINITY`: it compares equal to itself, greater than every
//! finite odds value, and converts back to exactly 1. NaN is never accepted.

use crate::error::{DomainError, Result};

/// Odds sentinel for a certain event.
pub const CERTAIN_ODDS: f64 = f64::INFINITY;

/// Check that `value` is a probability in [0, 1].
pub fn validate_probability(field: &'static str, value: f64) -> Result<f64> {
    if value.is_nan() {
        return Err(DomainError::NotANumber { field });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(DomainError::OutOfUnitInterval { field, value });
    }
    Ok(value)
}

/// Check that `value` is non-negative. `+inf` is allowed.
pub fn validate_non_negative(field: &'static str, value: f64) -> Result<f64> {
    if value.is_nan() {
        return Err(DomainError::NotANumber { field });
    }
    if value < 0.0 {
        return Err(DomainError::Negative { field, value });
    }
    Ok(value)
}

/// Convert a probability to odds.
///
/// Returns [`CERTAIN_ODDS`] for `p = 1`; that boundary is expected, not an error.
pub fn probability_to_odds(p: f64) -> Result<f64> {
    let p = validate_probability("probability", p)?;
    if p == 1.0 {
        return Ok(CERTAIN_ODDS);
    }
    Ok(p / (1.0 - p))
}

/// Convert odds back to a probability. [`CERTAIN_ODDS`] maps to exactly 1.
pub fn odds_to_probability(odds: f64) -> Result<f64> {
    let odds = validate_non_negative("odds", odds)?;
    if odds == CERTAIN_ODDS {
        return Ok(1.0);
    }
    Ok(odds / (1.0 + odds))
}

/// Natural log of the odds. `p = 0` gives `-inf`, `p = 1` gives `+inf`.
pub fn log_odds(p: f64) -> Result<f64> {
    Ok(probability_to_odds(p)?.ln())
}
