//! Request and response bodies for the four engine operations.
//!
//! Field names are camelCase on the wire; snake_case aliases are accepted.
//! Every request field is required.

use crate::api::error::ApiError;
use crate::decision::ActionTier;
use dpe_config::TierThresholds;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A number as sent by an untrusted caller: a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

impl NumericInput {
    /// Parse to a finite number. Range checks happen later, in the kernels.
    pub fn finite(&self, field: &str) -> Result<f64, ApiError> {
        let value = self.parse(field)?;
        if !value.is_finite() {
            return Err(ApiError::invalid_field(field, "must be a finite number"));
        }
        Ok(value)
    }

    /// Parse to a number that may also be `+inf` ("Infinity").
    ///
    /// Used for likelihood ratios, so a ratio returned by the engine can be
    /// sent back unchanged.
    pub fn unbounded(&self, field: &str) -> Result<f64, ApiError> {
        let value = self.parse(field)?;
        if value.is_nan() || value == f64::NEG_INFINITY {
            return Err(ApiError::invalid_field(
                field,
                "must be a number or \"Infinity\"",
            ));
        }
        Ok(value)
    }

    fn parse(&self, field: &str) -> Result<f64, ApiError> {
        match self {
            NumericInput::Number(n) => Ok(*n),
            NumericInput::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(ApiError::invalid_field(field, "must not be blank"));
                }
                trimmed.parse::<f64>().map_err(|_| {
                    ApiError::invalid_field(field, format!("'{}' is not a decimal number", trimmed))
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostTestRequest {
    #[serde(alias = "pretest_probability")]
    pub pretest_probability: NumericInput,
    #[serde(alias = "likelihood_ratio")]
    pub likelihood_ratio: NumericInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostTestResponse {
    pub post_test_probability: f64,
    #[serde(with = "dpe_math::math::serde_unbounded")]
    #[schemars(schema_with = "dpe_math::math::serde_unbounded::schema")]
    pub post_test_odds: f64,
    #[serde(with = "dpe_math::math::serde_unbounded")]
    #[schemars(schema_with = "dpe_math::math::serde_unbounded::schema")]
    pub pretest_odds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BothOutcomesRequest {
    #[serde(alias = "pretest_probability")]
    pub pretest_probability: NumericInput,
    #[serde(alias = "lr_positive")]
    pub lr_positive: NumericInput,
    #[serde(alias = "lr_negative")]
    pub lr_negative: NumericInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BothOutcomesResponse {
    pub posttest_if_positive: f64,
    pub posttest_if_negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LikelihoodRatioRequest {
    pub sensitivity: NumericInput,
    pub specificity: NumericInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikelihoodRatioResponse {
    #[serde(with = "dpe_math::math::serde_unbounded")]
    #[schemars(schema_with = "dpe_math::math::serde_unbounded::schema")]
    pub lr_positive: f64,
    pub lr_negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TierRequest {
    #[serde(alias = "current_probability")]
    pub current_probability: NumericInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierResponse {
    pub tier: ActionTier,
    pub rationale: String,
    pub probability: f64,
    pub thresholds: TierThresholds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_and_strings_both_parse() {
        let req: PostTestRequest =
            serde_json::from_str(r#"{"pretestProbability": "0.30", "likelihoodRatio": 10}"#)
                .unwrap();
        assert_eq!(req.pretest_probability.finite("p").unwrap(), 0.30);
        assert_eq!(req.likelihood_ratio.unbounded("lr").unwrap(), 10.0);
    }

    #[test]
    fn snake_case_aliases_accepted() {
        let req: BothOutcomesRequest = serde_json::from_str(
            r#"{"pretest_probability": 0.3, "lr_positive": 8.5, "lr_negative": "0.1667"}"#,
        )
        .unwrap();
        assert_eq!(req.lr_negative.unbounded("lrNegative").unwrap(), 0.1667);
    }

    #[test]
    fn missing_field_fails_deserialisation() {
        let err = serde_json::from_str::<LikelihoodRatioRequest>(r#"{"sensitivity": 0.9}"#)
            .unwrap_err();
        assert!(err.to_string().contains("specificity"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(serde_json::from_str::<TierRequest>(
            r#"{"currentProbability": 0.5, "threshold": 0.2}"#
        )
        .is_err());
    }

    #[test]
    fn text_validation() {
        assert!(NumericInput::from("abc").finite("p").is_err());
        assert!(NumericInput::from("   ").finite("p").is_err());
        assert!(NumericInput::from("NaN").finite("p").is_err());
        assert!(NumericInput::from("inf").finite("p").is_err());
        assert_eq!(NumericInput::from(" 1e-2 ").finite("p").unwrap(), 0.01);
    }

    #[test]
    fn unbounded_accepts_infinity_only() {
        assert!(NumericInput::from("Infinity").unbounded("lr").unwrap().is_infinite());
        assert!(NumericInput::from("-inf").unbounded("lr").is_err());
        assert!(NumericInput::from("nan").unbounded("lr").is_err());
        // Negative finite ratios pass parsing; the kernel rejects them.
        assert_eq!(NumericInput::from(-2.0).unbounded("lr").unwrap(), -2.0);
    }

    #[test]
    fn infinite_ratio_serialises_as_text() {
        let resp = LikelihoodRatioResponse {
            lr_positive: f64::INFINITY,
            lr_negative: 0.1,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["lrPositive"], "Infinity");
        assert_eq!(json["lrNegative"], 0.1);
    }
}
