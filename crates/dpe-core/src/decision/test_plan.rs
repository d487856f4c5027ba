//! Decision value of a test before it is ordered.
//!
//! Combines the dual-outcome planner with the tier recommender: a test whose
//! positive and negative results both leave the tier where it is cannot
//! change management at the configured thresholds.

use crate::decision::tier::{tier_for, ActionTier};
use dpe_config::TierThresholds;
use dpe_math::{
    plan_both_outcomes, required_likelihood_ratio, DomainError, OutcomePlan, TestCharacteristics,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Likelihood ratios that would move the prior onto each threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThresholdRatios {
    /// Smallest LR that reaches the treatment threshold.
    #[serde(with = "dpe_math::math::serde_unbounded")]
    #[schemars(schema_with = "dpe_math::math::serde_unbounded::schema")]
    pub to_treatment_threshold: f64,
    /// LR that lands exactly on the test threshold; anything lower rules out.
    pub to_test_threshold: f64,
}

/// Tier consequences of both possible results of one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestPlan {
    pub outcomes: OutcomePlan,
    pub thresholds: TierThresholds,
    pub current_tier: ActionTier,
    pub tier_if_positive: ActionTier,
    pub tier_if_negative: ActionTier,
    /// True when at least one result moves the tier.
    pub changes_management: bool,
    /// Absent when the prior is already certain.
    pub threshold_ratios: Option<ThresholdRatios>,
}

/// Plan a test given its likelihood ratios.
pub fn plan_test(
    prior_probability: f64,
    lr_positive: f64,
    lr_negative: f64,
    thresholds: &TierThresholds,
) -> Result<TestPlan, DomainError> {
    thresholds.check()?;
    let outcomes = plan_both_outcomes(prior_probability, lr_positive, lr_negative)?;

    let current_tier = tier_for(outcomes.pretest_probability, thresholds)?;
    let tier_if_positive = tier_for(outcomes.posttest_if_positive, thresholds)?;
    let tier_if_negative = tier_for(outcomes.posttest_if_negative, thresholds)?;

    Ok(TestPlan {
        outcomes,
        thresholds: *thresholds,
        current_tier,
        tier_if_positive,
        tier_if_negative,
        changes_management: tier_if_positive != current_tier || tier_if_negative != current_tier,
        threshold_ratios: threshold_ratios(outcomes.pretest_probability, thresholds)?,
    })
}

/// Plan a test given its sensitivity and specificity.
pub fn plan_test_with_characteristics(
    prior_probability: f64,
    test: &TestCharacteristics,
    thresholds: &TierThresholds,
) -> Result<TestPlan, DomainError> {
    let lrs = test.likelihood_ratios()?;
    plan_test(prior_probability, lrs.lr_positive, lrs.lr_negative, thresholds)
}

fn threshold_ratios(
    prior: f64,
    thresholds: &TierThresholds,
) -> Result<Option<ThresholdRatios>, DomainError> {
    if prior == 0.0 || prior == 1.0 {
        return Ok(None);
    }
    Ok(Some(ThresholdRatios {
        to_treatment_threshold: required_likelihood_ratio(prior, thresholds.treatment_threshold)?,
        to_test_threshold: required_likelihood_ratio(prior, thresholds.test_threshold)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_each_outcome() {
        // sens 0.85 / spec 0.90 at 30%: positive ~0.785, negative ~0.067
        let test = TestCharacteristics::new(0.85, 0.90).unwrap();
        let plan =
            plan_test_with_characteristics(0.30, &test, &TierThresholds::default()).unwrap();
        assert_eq!(plan.current_tier, ActionTier::OrderTest);
        assert_eq!(plan.tier_if_positive, ActionTier::OrderTest);
        assert_eq!(plan.tier_if_negative, ActionTier::OrderTest);
        assert!(!plan.changes_management);

        let strong = plan_test(0.30, 40.0, 0.05, &TierThresholds::default()).unwrap();
        assert_eq!(strong.tier_if_positive, ActionTier::TreatEmpirically);
        assert_eq!(strong.tier_if_negative, ActionTier::NoAction);
        assert!(strong.changes_management);
    }

    #[test]
    fn threshold_ratios_reach_thresholds() {
        let t = TierThresholds::default();
        let plan = plan_test(0.30, 2.0, 0.5, &t).unwrap();
        let ratios = plan.threshold_ratios.unwrap();
        let up = dpe_math::update_probability(0.30, ratios.to_treatment_threshold).unwrap();
        let down = dpe_math::update_probability(0.30, ratios.to_test_threshold).unwrap();
        assert!((up - 0.90).abs() < 1e-9);
        assert!((down - 0.05).abs() < 1e-9);
    }

    #[test]
    fn certain_prior_has_no_threshold_ratios() {
        let plan = plan_test(1.0, 5.0, 0.2, &TierThresholds::default()).unwrap();
        assert!(plan.threshold_ratios.is_none());
        assert_eq!(plan.current_tier, ActionTier::TreatEmpirically);
        assert!(!plan.changes_management);
    }

    #[test]
    fn propagates_domain_errors() {
        assert!(plan_test(0.3, -1.0, 0.5, &TierThresholds::default()).is_err());
        let inverted = TierThresholds {
            test_threshold: 0.9,
            treatment_threshold: 0.1,
        };
        assert!(matches!(
            plan_test(0.3, 2.0, 0.5, &inverted),
            Err(DomainError::UnorderedThresholds { .. })
        ));
    }

    #[test]
    fn treatment_threshold_of_one_needs_infinite_ratio() {
        let t = TierThresholds::new(0.05, 1.0).unwrap();
        let plan = plan_test(0.5, 2.0, 0.5, &t).unwrap();
        let ratios = plan.threshold_ratios.unwrap();
        assert!(ratios.to_treatment_threshold.is_infinite());
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(
            json["threshold_ratios"]["to_treatment_threshold"],
            "Infinity"
        );
    }
}
