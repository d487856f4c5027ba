//! Request boundary tests: the four operations over raw JSON bodies.

use dpe_config::{Policy, TierThresholds};
use dpe_core::api::{ApiError, Engine, Operation};
use serde_json::{json, Value};

fn engine() -> Engine {
    Engine::new(Policy::default()).unwrap()
}

fn call(op: Operation, body: Value) -> Result<Value, ApiError> {
    engine().handle_json(op, &body.to_string())
}

fn approx(value: &Value, expected: f64, tol: f64) -> bool {
    value.as_f64().is_some_and(|v| (v - expected).abs() <= tol)
}

mod scenarios {
    use super::*;

    #[test]
    fn posttest_after_positive_result() {
        let out = call(
            Operation::PostTest,
            json!({"pretestProbability": 0.30, "likelihoodRatio": 10.0}),
        )
        .unwrap();
        assert!(approx(&out["postTestProbability"], 0.8108, 1e-4), "{out}");
        assert!(approx(&out["pretestOdds"], 0.4286, 1e-4), "{out}");
        assert!(approx(&out["postTestOdds"], 4.286, 1e-3), "{out}");
    }

    #[test]
    fn ratios_from_characteristics() {
        let out = call(
            Operation::LikelihoodRatios,
            json!({"sensitivity": 0.85, "specificity": 0.90}),
        )
        .unwrap();
        assert!(approx(&out["lrPositive"], 8.5, 1e-9), "{out}");
        assert!(approx(&out["lrNegative"], 0.1667, 1e-4), "{out}");
    }

    #[test]
    fn both_outcomes_from_derived_pair() {
        let out = call(
            Operation::BothOutcomes,
            json!({"pretestProbability": 0.30, "lrPositive": 8.5, "lrNegative": 0.15 / 0.90}),
        )
        .unwrap();
        assert!(approx(&out["posttestIfPositive"], 0.7846, 1e-3), "{out}");
        assert!(approx(&out["posttestIfNegative"], 0.0667, 1e-4), "{out}");
    }

    #[test]
    fn default_tiers() {
        for (p, tier) in [
            (0.02, "no_action"),
            (0.50, "order_test"),
            (0.95, "treat_empirically"),
        ] {
            let out = call(Operation::TestingTier, json!({"currentProbability": p})).unwrap();
            assert_eq!(out["tier"], tier, "probability {p}");
            assert!(out["rationale"].as_str().is_some_and(|r| !r.is_empty()));
        }
    }

    #[test]
    fn perfect_specificity_reports_infinite_positive_ratio() {
        let out = call(
            Operation::LikelihoodRatios,
            json!({"sensitivity": 0.9, "specificity": 1.0}),
        )
        .unwrap();
        assert_eq!(out["lrPositive"], "Infinity");
        assert!(approx(&out["lrNegative"], 0.1, 1e-12));
    }

    #[test]
    fn infinite_ratio_can_be_sent_back() {
        let out = call(
            Operation::PostTest,
            json!({"pretestProbability": 0.2, "likelihoodRatio": "Infinity"}),
        )
        .unwrap();
        assert_eq!(out["postTestProbability"], 1.0);
        assert_eq!(out["postTestOdds"], "Infinity");
    }
}

mod validation {
    use super::*;

    #[test]
    fn zero_specificity_with_perfect_sensitivity_is_a_domain_error() {
        let err = call(
            Operation::LikelihoodRatios,
            json!({"sensitivity": 1.0, "specificity": 0.0}),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Domain(_)), "{err:?}");
        assert_eq!(err.http_status(), 422);
    }

    #[test]
    fn out_of_range_probability_is_a_domain_error() {
        let err = call(
            Operation::TestingTier,
            json!({"currentProbability": 1.5}),
        )
        .unwrap_err();
        assert_eq!(err.http_status(), 422);
    }

    #[test]
    fn negative_ratio_is_a_domain_error() {
        let err = call(
            Operation::PostTest,
            json!({"pretestProbability": 0.3, "likelihoodRatio": -2}),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Domain(_)));
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = call(Operation::PostTest, json!({"pretestProbability": 0.3})).unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert!(err.to_string().contains("likelihoodRatio"), "{err}");
    }

    #[test]
    fn non_numeric_text_is_rejected() {
        let err = call(
            Operation::TestingTier,
            json!({"currentProbability": "high"}),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let out = call(
            Operation::TestingTier,
            json!({"currentProbability": "0.5"}),
        )
        .unwrap();
        assert_eq!(out["tier"], "order_test");
    }

    #[test]
    fn snake_case_aliases_are_accepted() {
        let out = call(
            Operation::PostTest,
            json!({"pretest_probability": 0.3, "likelihood_ratio": 1.0}),
        )
        .unwrap();
        assert!(approx(&out["postTestProbability"], 0.3, 1e-12));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = call(
            Operation::TestingTier,
            json!({"currentProbability": 0.5, "urgent": true}),
        )
        .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = engine()
            .handle_json(Operation::TestingTier, "{not json")
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn infinite_pretest_is_rejected() {
        let err = call(
            Operation::PostTest,
            json!({"pretestProbability": "Infinity", "likelihoodRatio": 2}),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}

mod policy {
    use super::*;

    #[test]
    fn engine_uses_policy_thresholds() {
        let policy = Policy {
            thresholds: TierThresholds {
                test_threshold: 0.01,
                treatment_threshold: 0.60,
            },
            ..Policy::default()
        };
        let engine = Engine::new(policy).unwrap();
        let out = engine
            .handle_json(Operation::TestingTier, r#"{"currentProbability": 0.7}"#)
            .unwrap();
        assert_eq!(out["tier"], "treat_empirically");
        assert_eq!(out["thresholds"]["treatment_threshold"], 0.60);
    }

    #[test]
    fn invalid_policy_is_a_configuration_error() {
        let mut policy = Policy::default();
        policy.thresholds.test_threshold = 0.95;
        let err = Engine::new(policy).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn operations_parse_from_wire_names() {
        for op in Operation::ALL {
            assert_eq!(op.wire_name().parse::<Operation>().unwrap(), op);
        }
        assert!("deleteEverything".parse::<Operation>().is_err());
    }

    #[test]
    fn every_operation_publishes_schemas() {
        for op in Operation::ALL {
            let request = serde_json::to_value(op.request_schema()).unwrap();
            let response = serde_json::to_value(op.response_schema()).unwrap();
            assert!(request.get("properties").is_some(), "{op}");
            assert!(response.get("properties").is_some(), "{op}");
        }
    }
}
