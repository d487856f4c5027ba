//! Bayesian updating on the odds scale.
//!
//! ```text
//! posterior_odds = prior_odds * LR
//! ```
//!
//! Certainty is absorbing: a prior of 0 stays 0 and a prior of 1 stays 1 for
//! every ratio, including 0 and `+inf`. For priors strictly inside (0, 1), a
//! ratio of `+inf` gives 1 and a ratio of 0 gives 0.

use crate::error::{DomainError, Result};
use crate::math::odds::{
    odds_to_probability, probability_to_odds, validate_non_negative, validate_probability,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One step of a sequential update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvidenceStep {
    pub prior: f64,
    #[serde(with = "crate::math::serde_unbounded")]
    #[schemars(schema_with = "crate::math::serde_unbounded::schema")]
    pub likelihood_ratio: f64,
    pub posterior: f64,
}

/// Apply one likelihood ratio to a prior probability.
pub fn update_probability(prior_probability: f64, likelihood_ratio: f64) -> Result<f64> {
    let prior = validate_probability("prior_probability", prior_probability)?;
    let lr = validate_non_negative("likelihood_ratio", likelihood_ratio)?;

    if prior == 0.0 || prior == 1.0 {
        return Ok(prior);
    }

    // prior_odds is finite and positive here, so the product is never NaN.
    let posterior_odds = probability_to_odds(prior)? * lr;
    odds_to_probability(posterior_odds)
}

/// Apply likelihood ratios one after another, feeding each posterior forward.
///
/// Odds multiplication is commutative, so the result does not depend on the
/// order of `likelihood_ratios`. That only holds as a model of the patient if
/// the tests are conditionally independent given the diagnosis. Correlated
/// tests (two imaging studies of the same lesion, a panel sharing one assay)
/// double-count evidence when chained this way; callers own that judgement.
///
/// An empty sequence returns the validated prior.
pub fn update_with_sequential_evidence(
    prior_probability: f64,
    likelihood_ratios: &[f64],
) -> Result<f64> {
    let mut probability = validate_probability("prior_probability", prior_probability)?;
    for &lr in likelihood_ratios {
        probability = update_probability(probability, lr)?;
    }
    Ok(probability)
}

/// Like [`update_with_sequential_evidence`], returning every intermediate step.
pub fn sequential_trajectory(
    prior_probability: f64,
    likelihood_ratios: &[f64],
) -> Result<Vec<EvidenceStep>> {
    let mut probability = validate_probability("prior_probability", prior_probability)?;
    let mut steps = Vec::with_capacity(likelihood_ratios.len());
    for &lr in likelihood_ratios {
        let posterior = update_probability(probability, lr)?;
        steps.push(EvidenceStep {
            prior: probability,
            likelihood_ratio: lr,
            posterior,
        });
        probability = posterior;
    }
    Ok(steps)
}

/// Likelihood ratio that moves `prior_probability` exactly to `target_probability`.
///
/// Returns 1 when they are equal, 0 for a target of 0 and `+inf` for a target
/// of 1. A certain prior (0 or 1) cannot reach any other value.
pub fn required_likelihood_ratio(prior_probability: f64, target_probability: f64) -> Result<f64> {
    let prior = validate_probability("prior_probability", prior_probability)?;
    let target = validate_probability("target_probability", target_probability)?;

    if prior == target {
        return Ok(1.0);
    }
    if prior == 0.0 || prior == 1.0 {
        return Err(DomainError::Unreachable { prior, target });
    }
    if target == 1.0 {
        return Ok(f64::INFINITY);
    }
    Ok(probability_to_odds(target)? / probability_to_odds(prior)?)
}
