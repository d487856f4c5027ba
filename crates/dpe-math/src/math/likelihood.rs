//! Likelihood ratios from test sensitivity and specificity.
//!
//! ```text
//! LR+ = sensitivity / (1 - specificity)
//! LR- = (1 - sensitivity) / specificity
//! ```
//!
//! The two edges are deliberately asymmetric. A perfectly specific test
//! (`specificity = 1`) has `LR+ = +inf`: a positive result is pathognomonic.
//! A test with `specificity = 0` has no interpretable negative result, so
//! `LR-` is a [`DomainError`] rather than a sentinel.

use crate::error::{DomainError, Result};
use crate::math::odds::validate_probability;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Operating characteristics of a diagnostic test.
///
/// `Copy` and immutable: every derivation from the same value yields
/// bit-identical ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "RawCharacteristics")]
pub struct TestCharacteristics {
    sensitivity: f64,
    specificity: f64,
}

impl TestCharacteristics {
    /// Validate and build. Both values must lie in [0, 1].
    pub fn new(sensitivity: f64, specificity: f64) -> Result<Self> {
        Ok(Self {
            sensitivity: validate_probability("sensitivity", sensitivity)?,
            specificity: validate_probability("specificity", specificity)?,
        })
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn specificity(&self) -> f64 {
        self.specificity
    }

    /// Derive the LR+/LR- pair for this test.
    pub fn likelihood_ratios(&self) -> Result<LikelihoodRatios> {
        derive_likelihood_ratios(self.sensitivity, self.specificity)
    }
}

#[derive(Deserialize, JsonSchema)]
struct RawCharacteristics {
    sensitivity: f64,
    specificity: f64,
}

impl TryFrom<RawCharacteristics> for TestCharacteristics {
    type Error = DomainError;

    fn try_from(raw: RawCharacteristics) -> Result<Self> {
        TestCharacteristics::new(raw.sensitivity, raw.specificity)
    }
}

/// Positive and negative likelihood ratios of one test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LikelihoodRatios {
    /// Multiplier on prior odds after a positive result. May be `+inf`.
    #[serde(with = "crate::math::serde_unbounded")]
    #[schemars(schema_with = "crate::math::serde_unbounded::schema")]
    pub lr_positive: f64,
    /// Multiplier on prior odds after a negative result.
    pub lr_negative: f64,
}

/// Derive LR+ and LR- from sensitivity and specificity.
pub fn derive_likelihood_ratios(sensitivity: f64, specificity: f64) -> Result<LikelihoodRatios> {
    let sensitivity = validate_probability("sensitivity", sensitivity)?;
    let specificity = validate_probability("specificity", specificity)?;

    if specificity == 0.0 {
        return Err(DomainError::DegenerateNegativeRatio { sensitivity });
    }

    let lr_positive = if specificity == 1.0 {
        f64::INFINITY
    } else {
        sensitivity / (1.0 - specificity)
    };
    let lr_negative = (1.0 - sensitivity) / specificity;

    Ok(LikelihoodRatios {
        lr_positive,
        lr_negative,
    })
}
