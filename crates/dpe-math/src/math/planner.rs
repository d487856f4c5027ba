//! Dual-outcome planning: the posterior for both test results, before ordering.

use crate::error::Result;
use crate::math::likelihood::derive_likelihood_ratios;
use crate::math::update::update_probability;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Posttest probability for each possible result of one test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutcomePlan {
    pub pretest_probability: f64,
    pub posttest_if_positive: f64,
    pub posttest_if_negative: f64,
}

impl OutcomePlan {
    /// Width of the probability swing between the two outcomes.
    pub fn spread(&self) -> f64 {
        self.posttest_if_positive - self.posttest_if_negative
    }
}

/// Evaluate both outcomes against the same prior.
///
/// The two updates share no state and may run in either order.
pub fn plan_both_outcomes(
    prior_probability: f64,
    lr_positive: f64,
    lr_negative: f64,
) -> Result<OutcomePlan> {
    let posttest_if_positive = update_probability(prior_probability, lr_positive)?;
    let posttest_if_negative = update_probability(prior_probability, lr_negative)?;
    Ok(OutcomePlan {
        pretest_probability: prior_probability,
        posttest_if_positive,
        posttest_if_negative,
    })
}

/// Derive LR+/LR- from the test, then plan both outcomes.
pub fn plan_from_test_characteristics(
    prior_probability: f64,
    sensitivity: f64,
    specificity: f64,
) -> Result<OutcomePlan> {
    let lrs = derive_likelihood_ratios(sensitivity, specificity)?;
    plan_both_outcomes(prior_probability, lrs.lr_positive, lrs.lr_negative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn plan_from_characteristics_both_outcomes() {
        let plan = plan_from_test_characteristics(0.30, 0.85, 0.90).unwrap();
        assert!(
            approx_eq(plan.posttest_if_positive, 0.7848, 1e-3),
            "{}",
            plan.posttest_if_positive
        );
        assert!(
            approx_eq(plan.posttest_if_negative, 0.0667, 1e-4),
            "{}",
            plan.posttest_if_negative
        );
        assert!(plan.spread() > 0.7);
    }

    #[test]
    fn plan_matches_independent_updates() {
        let plan = plan_both_outcomes(0.2, 4.0, 0.25).unwrap();
        assert_eq!(
            plan.posttest_if_positive,
            update_probability(0.2, 4.0).unwrap()
        );
        assert_eq!(
            plan.posttest_if_negative,
            update_probability(0.2, 0.25).unwrap()
        );
    }

    #[test]
    fn degenerate_specificity_propagates_unchanged() {
        assert_eq!(
            plan_from_test_characteristics(0.3, 1.0, 0.0),
            Err(DomainError::DegenerateNegativeRatio { sensitivity: 1.0 })
        );
    }

    #[test]
    fn invalid_prior_fails() {
        assert!(plan_both_outcomes(-0.1, 2.0, 0.5).is_err());
    }
}
