//! Action-tier recommendation from the test/treatment threshold model.
//!
//! ```text
//!   0 ──── no_action ────┤ test ├──── order_test ────┤ treatment ├── treat_empirically ── 1
//! ```
//!
//! A probability exactly on a threshold belongs to the higher tier.

use dpe_config::TierThresholds;
use dpe_math::{validate_probability, DomainError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Next clinical action, ordered by escalating commitment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ActionTier {
    /// Diagnosis effectively ruled out; no further workup.
    NoAction,
    /// Gray zone; more testing carries the most information.
    OrderTest,
    /// Probability high enough to treat without further testing.
    TreatEmpirically,
}

impl ActionTier {
    pub const ALL: [ActionTier; 3] = [
        ActionTier::NoAction,
        ActionTier::OrderTest,
        ActionTier::TreatEmpirically,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTier::NoAction => "no_action",
            ActionTier::OrderTest => "order_test",
            ActionTier::TreatEmpirically => "treat_empirically",
        }
    }

    fn for_probability(probability: f64, thresholds: &TierThresholds) -> Self {
        if probability < thresholds.test_threshold {
            ActionTier::NoAction
        } else if probability < thresholds.treatment_threshold {
            ActionTier::OrderTest
        } else {
            ActionTier::TreatEmpirically
        }
    }
}

impl fmt::Display for ActionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tier together with the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TierRecommendation {
    pub tier: ActionTier,
    pub probability: f64,
    pub thresholds: TierThresholds,
    pub rationale: String,
}

/// Map a probability to an action tier.
///
/// Fails if the probability is outside [0, 1] or the thresholds are not
/// ordered `0 <= test < treatment <= 1`.
pub fn recommend_tier(
    probability: f64,
    thresholds: &TierThresholds,
) -> Result<TierRecommendation, DomainError> {
    let probability = validate_probability("probability", probability)?;
    thresholds.check()?;

    let tier = ActionTier::for_probability(probability, thresholds);
    Ok(TierRecommendation {
        tier,
        probability,
        thresholds: *thresholds,
        rationale: rationale(tier, probability, thresholds),
    })
}

pub(crate) fn tier_for(
    probability: f64,
    thresholds: &TierThresholds,
) -> Result<ActionTier, DomainError> {
    recommend_tier(probability, thresholds).map(|r| r.tier)
}

fn rationale(tier: ActionTier, probability: f64, thresholds: &TierThresholds) -> String {
    match tier {
        ActionTier::NoAction => format!(
            "probability {:.4} is below the test threshold {:.4}; further workup is not justified",
            probability, thresholds.test_threshold
        ),
        ActionTier::OrderTest => format!(
            "probability {:.4} lies between the test threshold {:.4} and the treatment threshold {:.4}; further testing is most informative here",
            probability, thresholds.test_threshold, thresholds.treatment_threshold
        ),
        ActionTier::TreatEmpirically => format!(
            "probability {:.4} is at or above the treatment threshold {:.4}; treat without further testing",
            probability, thresholds.treatment_threshold
        ),
    }
}
