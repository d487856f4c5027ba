//! Request boundary for the four engine operations.
//!
//! Untrusted bodies are deserialised into typed requests, every number is
//! parsed and checked, and only then handed to the pure kernels. A rejected
//! request is reported as an [`ApiError`]; no default or best-guess value is
//! ever substituted.

pub mod error;
pub mod request;

pub use error::ApiError;
pub use request::{
    BothOutcomesRequest, BothOutcomesResponse, LikelihoodRatioRequest, LikelihoodRatioResponse,
    NumericInput, PostTestRequest, PostTestResponse, TierRequest, TierResponse,
};

use crate::decision::recommend_tier;
use crate::logging::{event_names, Stage};
use dpe_config::{LoadedPolicy, Policy};
use dpe_math::{
    derive_likelihood_ratios, plan_both_outcomes, probability_to_odds, update_probability,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// The operations exposed at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Operation {
    /// calculatePostTestProbability
    #[value(name = "post-test")]
    PostTest,
    /// calculateBothOutcomes
    #[value(name = "both-outcomes")]
    BothOutcomes,
    /// calculateLikelihoodRatios
    #[value(name = "likelihood-ratios")]
    LikelihoodRatios,
    /// recommendTestingTier
    #[value(name = "testing-tier")]
    TestingTier,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::PostTest,
        Operation::BothOutcomes,
        Operation::LikelihoodRatios,
        Operation::TestingTier,
    ];

    /// Name used by external callers.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Operation::PostTest => "calculatePostTestProbability",
            Operation::BothOutcomes => "calculateBothOutcomes",
            Operation::LikelihoodRatios => "calculateLikelihoodRatios",
            Operation::TestingTier => "recommendTestingTier",
        }
    }

    /// JSON Schema of the request body.
    pub fn request_schema(&self) -> schemars::Schema {
        match self {
            Operation::PostTest => schemars::schema_for!(PostTestRequest),
            Operation::BothOutcomes => schemars::schema_for!(BothOutcomesRequest),
            Operation::LikelihoodRatios => schemars::schema_for!(LikelihoodRatioRequest),
            Operation::TestingTier => schemars::schema_for!(TierRequest),
        }
    }

    /// JSON Schema of the response body.
    pub fn response_schema(&self) -> schemars::Schema {
        match self {
            Operation::PostTest => schemars::schema_for!(PostTestResponse),
            Operation::BothOutcomes => schemars::schema_for!(BothOutcomesResponse),
            Operation::LikelihoodRatios => schemars::schema_for!(LikelihoodRatioResponse),
            Operation::TestingTier => schemars::schema_for!(TierResponse),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Operation::ALL
            .iter()
            .copied()
            .find(|op| {
                op.wire_name().eq_ignore_ascii_case(wanted)
                    || clap::ValueEnum::to_possible_value(op)
                        .is_some_and(|v| v.matches(wanted, true))
            })
            .ok_or_else(|| format!("unknown operation: {}", s))
    }
}

/// Stateless calculator bound to one validated policy.
///
/// Cheap to clone; holds no mutable state, so one instance may serve any
/// number of concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    policy: Policy,
}

impl Engine {
    /// Build an engine, rejecting a policy that fails validation.
    pub fn new(policy: Policy) -> Result<Self, ApiError> {
        policy.validate().map_err(|e| {
            ApiError::Configuration(dpe_common::Error::InvalidPolicy(e.to_string()))
        })?;
        Ok(Self { policy })
    }

    pub fn from_loaded(loaded: LoadedPolicy) -> Result<Self, ApiError> {
        Self::new(loaded.policy)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn calculate_post_test_probability(
        &self,
        request: &PostTestRequest,
    ) -> Result<PostTestResponse, ApiError> {
        log_outcome(Operation::PostTest, self.post_test(request))
    }

    pub fn calculate_both_outcomes(
        &self,
        request: &BothOutcomesRequest,
    ) -> Result<BothOutcomesResponse, ApiError> {
        log_outcome(Operation::BothOutcomes, self.both_outcomes(request))
    }

    pub fn calculate_likelihood_ratios(
        &self,
        request: &LikelihoodRatioRequest,
    ) -> Result<LikelihoodRatioResponse, ApiError> {
        log_outcome(Operation::LikelihoodRatios, self.likelihood_ratios(request))
    }

    pub fn recommend_testing_tier(&self, request: &TierRequest) -> Result<TierResponse, ApiError> {
        log_outcome(Operation::TestingTier, self.testing_tier(request))
    }

    fn post_test(&self, request: &PostTestRequest) -> Result<PostTestResponse, ApiError> {
        let pretest = request.pretest_probability.finite("pretestProbability")?;
        let lr = request.likelihood_ratio.unbounded("likelihoodRatio")?;
        let post = update_probability(pretest, lr)?;
        Ok(PostTestResponse {
            post_test_probability: post,
            post_test_odds: probability_to_odds(post)?,
            pretest_odds: probability_to_odds(pretest)?,
        })
    }

    fn both_outcomes(&self, request: &BothOutcomesRequest) -> Result<BothOutcomesResponse, ApiError> {
        let pretest = request.pretest_probability.finite("pretestProbability")?;
        let lr_pos = request.lr_positive.unbounded("lrPositive")?;
        let lr_neg = request.lr_negative.unbounded("lrNegative")?;
        let plan = plan_both_outcomes(pretest, lr_pos, lr_neg)?;
        Ok(BothOutcomesResponse {
            posttest_if_positive: plan.posttest_if_positive,
            posttest_if_negative: plan.posttest_if_negative,
        })
    }

    fn likelihood_ratios(
        &self,
        request: &LikelihoodRatioRequest,
    ) -> Result<LikelihoodRatioResponse, ApiError> {
        let sensitivity = request.sensitivity.finite("sensitivity")?;
        let specificity = request.specificity.finite("specificity")?;
        let lrs = derive_likelihood_ratios(sensitivity, specificity)?;
        Ok(LikelihoodRatioResponse {
            lr_positive: lrs.lr_positive,
            lr_negative: lrs.lr_negative,
        })
    }

    fn testing_tier(&self, request: &TierRequest) -> Result<TierResponse, ApiError> {
        let probability = request.current_probability.finite("currentProbability")?;
        let rec = recommend_tier(probability, &self.policy.thresholds)?;
        debug!(
            event = event_names::DECIDE_TIER,
            stage = %Stage::Decide,
            tier = %rec.tier,
            probability = rec.probability,
            "tier recommended"
        );
        Ok(TierResponse {
            tier: rec.tier,
            rationale: rec.rationale,
            probability: rec.probability,
            thresholds: rec.thresholds,
        })
    }

    /// Dispatch a raw JSON body to an operation and return the JSON response.
    pub fn handle_json(&self, operation: Operation, body: &str) -> Result<serde_json::Value, ApiError> {
        match operation {
            Operation::PostTest => {
                respond(self.calculate_post_test_probability(&parse_body(operation, body)?)?)
            }
            Operation::BothOutcomes => {
                respond(self.calculate_both_outcomes(&parse_body(operation, body)?)?)
            }
            Operation::LikelihoodRatios => {
                respond(self.calculate_likelihood_ratios(&parse_body(operation, body)?)?)
            }
            Operation::TestingTier => {
                respond(self.recommend_testing_tier(&parse_body(operation, body)?)?)
            }
        }
    }
}

fn parse_body<T: DeserializeOwned>(operation: Operation, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        let err = ApiError::from_json_error(&e);
        warn!(
            event = event_names::REQUEST_REJECTED,
            stage = %Stage::Request,
            operation = %operation,
            status = err.http_status(),
            error = %err,
            "request body rejected"
        );
        err
    })
}

fn respond<T: Serialize>(response: T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(response)
        .map_err(|e| ApiError::Configuration(dpe_common::Error::Json(e)))
}

fn log_outcome<T>(operation: Operation, result: Result<T, ApiError>) -> Result<T, ApiError> {
    match &result {
        Ok(_) => debug!(
            event = event_names::REQUEST_ACCEPTED,
            stage = %Stage::Calculate,
            operation = %operation,
            "request served"
        ),
        Err(err) => warn!(
            event = event_names::REQUEST_REJECTED,
            stage = %Stage::Request,
            operation = %operation,
            status = err.http_status(),
            error = %err,
            "request rejected"
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ActionTier;
    use dpe_config::TierThresholds;

    #[test]
    fn post_test_scenario() {
        let engine = Engine::default();
        let resp = engine
            .calculate_post_test_probability(&PostTestRequest {
                pretest_probability: 0.30.into(),
                likelihood_ratio: "10".into(),
            })
            .unwrap();
        assert!((resp.post_test_probability - 0.8108).abs() < 1e-4);
        assert!((resp.pretest_odds - 0.4286).abs() < 1e-4);
        assert!((resp.post_test_odds - 4.286).abs() < 1e-3);
    }

    #[test]
    fn certain_posterior_reports_infinite_odds() {
        let engine = Engine::default();
        let value = engine
            .handle_json(
                Operation::PostTest,
                r#"{"pretestProbability": 0.4, "likelihoodRatio": "Infinity"}"#,
            )
            .unwrap();
        assert_eq!(value["postTestProbability"], 1.0);
        assert_eq!(value["postTestOdds"], "Infinity");
    }

    #[test]
    fn tier_uses_policy_thresholds() {
        let mut policy = Policy::default();
        policy.thresholds = TierThresholds::new(0.01, 0.5).unwrap();
        let engine = Engine::new(policy).unwrap();
        let resp = engine
            .recommend_testing_tier(&TierRequest {
                current_probability: 0.6.into(),
            })
            .unwrap();
        assert_eq!(resp.tier, ActionTier::TreatEmpirically);
    }

    #[test]
    fn invalid_policy_is_configuration_error() {
        let mut policy = Policy::default();
        policy.thresholds.test_threshold = 0.95;
        let err = Engine::new(policy).unwrap_err();
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn handle_json_classifies_errors() {
        let engine = Engine::default();
        let missing = engine
            .handle_json(Operation::LikelihoodRatios, r#"{"sensitivity": 0.9}"#)
            .unwrap_err();
        assert_eq!(missing.http_status(), 400);
        assert!(matches!(
            missing,
            ApiError::Validation(dpe_common::Error::MissingField { ref field }) if field == "specificity"
        ));

        let out_of_range = engine
            .handle_json(
                Operation::LikelihoodRatios,
                r#"{"sensitivity": 1.0, "specificity": 0.0}"#,
            )
            .unwrap_err();
        assert_eq!(out_of_range.http_status(), 422);

        let garbage = engine.handle_json(Operation::TestingTier, "not json").unwrap_err();
        assert_eq!(garbage.http_status(), 400);
    }

    #[test]
    fn operation_names_parse() {
        assert_eq!(
            "calculateBothOutcomes".parse::<Operation>().unwrap(),
            Operation::BothOutcomes
        );
        assert_eq!("post-test".parse::<Operation>().unwrap(), Operation::PostTest);
        assert!("divide".parse::<Operation>().is_err());
    }

    #[test]
    fn request_schemas_list_required_fields() {
        let schema = serde_json::to_value(Operation::BothOutcomes.request_schema()).unwrap();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
        assert!(required.iter().any(|f| f == "lrPositive"));
    }
}
