//! Sequential posttest assessment: trajectory, evidence labels and tier.

use crate::decision::tier::{recommend_tier, TierRecommendation};
use dpe_config::TierThresholds;
use dpe_math::evidence::EvidenceSummary;
use dpe_math::{sequential_trajectory, validate_probability, DomainError, EvidenceStep};
use schemars::JsonSchema;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PosttestAssessment {
    pub pretest_probability: f64,
    pub posttest_probability: f64,
    pub steps: Vec<EvidenceStep>,
    /// One summary per ratio, in application order.
    pub evidence: Vec<EvidenceSummary>,
    pub recommendation: TierRecommendation,
}

/// Apply `likelihood_ratios` in order and recommend a tier for the result.
///
/// Assumes the ratios are conditionally independent given the diagnosis.
pub fn assess_posttest(
    pretest_probability: f64,
    likelihood_ratios: &[f64],
    thresholds: &TierThresholds,
) -> Result<PosttestAssessment, DomainError> {
    let pretest = validate_probability("pretest_probability", pretest_probability)?;
    let steps = sequential_trajectory(pretest, likelihood_ratios)?;
    let posttest = steps.last().map_or(pretest, |s| s.posterior);

    Ok(PosttestAssessment {
        pretest_probability: pretest,
        posttest_probability: posttest,
        evidence: likelihood_ratios
            .iter()
            .map(|&lr| EvidenceSummary::from_likelihood_ratio(lr))
            .collect(),
        steps,
        recommendation: recommend_tier(posttest, thresholds)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ActionTier;
    use dpe_math::evidence::{EvidenceDirection, EvidenceStrength};

    #[test]
    fn chained_ratios_end_in_treatment() {
        let a = assess_posttest(0.30, &[10.0, 3.0], &TierThresholds::default()).unwrap();
        assert_eq!(a.steps.len(), 2);
        assert!((a.steps[0].posterior - 0.8108).abs() < 1e-4);
        assert!(a.posttest_probability > 0.92);
        assert_eq!(a.recommendation.tier, ActionTier::TreatEmpirically);
        assert_eq!(a.evidence[0].strength, EvidenceStrength::Strong);
        assert_eq!(a.evidence[1].direction, EvidenceDirection::Supports);
    }

    #[test]
    fn no_evidence_keeps_pretest() {
        let a = assess_posttest(0.02, &[], &TierThresholds::default()).unwrap();
        assert_eq!(a.posttest_probability, 0.02);
        assert!(a.steps.is_empty());
        assert_eq!(a.recommendation.tier, ActionTier::NoAction);
    }

    #[test]
    fn bad_ratio_fails_whole_assessment() {
        assert!(assess_posttest(0.3, &[2.0, -1.0], &TierThresholds::default()).is_err());
        assert!(assess_posttest(1.3, &[2.0], &TierThresholds::default()).is_err());
    }
}
