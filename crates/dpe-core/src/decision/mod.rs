//! Decision policy: action tiers, sequential assessment and test planning.

pub mod assessment;
pub mod test_plan;
pub mod tier;

pub use assessment::{assess_posttest, PosttestAssessment};
pub use test_plan::{plan_test, plan_test_with_characteristics, TestPlan, ThresholdRatios};
pub use tier::{recommend_tier, ActionTier, TierRecommendation};
