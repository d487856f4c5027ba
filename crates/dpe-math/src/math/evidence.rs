//! Evidence strength of a likelihood ratio, for explainability.
//!
//! A likelihood ratio is a Bayes factor between "diagnosis present" and
//! "diagnosis absent". Its log is additive across conditionally independent
//! tests, and its magnitude is labelled on the Jeffreys scale. The raw ratio
//! is always preserved; labels are for presentation only.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Jeffreys scale thresholds (in nats)
const LN_3_2: f64 = 1.163_150_809_678_64; // ln(3.2)
const LN_32: f64 = 3.465_735_902_799_727; // ln(32)
const LN_100: f64 = 4.605_170_185_988_092; // ln(100)

/// Evidence in bits: log2 of the likelihood ratio.
///
/// Returns `-inf` for a ratio of 0, `+inf` for `+inf`, NaN for NaN or negative input.
pub fn delta_bits(likelihood_ratio: f64) -> f64 {
    if likelihood_ratio.is_nan() || likelihood_ratio < 0.0 {
        return f64::NAN;
    }
    likelihood_ratio.log2()
}

/// Evidence strength on the Jeffreys scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStrength {
    /// LR of exactly 1: the test result carries no information.
    None,
    /// |ln LR| < ln(3.2)
    Anecdotal,
    /// ln(3.2) <= |ln LR| < ln(10)
    Substantial,
    /// ln(10) <= |ln LR| < ln(32)
    Strong,
    /// ln(32) <= |ln LR| < ln(100)
    VeryStrong,
    /// |ln LR| >= ln(100), including the 0 and +inf ratios.
    Decisive,
}

impl EvidenceStrength {
    /// Classify from a log likelihood ratio (nats). Direction is ignored.
    pub fn from_log_lr(log_lr: f64) -> Self {
        if log_lr.is_nan() {
            return EvidenceStrength::None;
        }
        let magnitude = log_lr.abs();
        if magnitude < LN_3_2 {
            if magnitude < f64::EPSILON {
                EvidenceStrength::None
            } else {
                EvidenceStrength::Anecdotal
            }
        } else if magnitude < std::f64::consts::LN_10 {
            EvidenceStrength::Substantial
        } else if magnitude < LN_32 {
            EvidenceStrength::Strong
        } else if magnitude < LN_100 {
            EvidenceStrength::VeryStrong
        } else {
            EvidenceStrength::Decisive
        }
    }

    pub fn from_likelihood_ratio(likelihood_ratio: f64) -> Self {
        if likelihood_ratio.is_nan() || likelihood_ratio < 0.0 {
            return EvidenceStrength::None;
        }
        Self::from_log_lr(likelihood_ratio.ln())
    }

    pub fn label(&self) -> &'static str {
        match self {
            EvidenceStrength::None => "none",
            EvidenceStrength::Anecdotal => "anecdotal",
            EvidenceStrength::Substantial => "substantial",
            EvidenceStrength::Strong => "strong",
            EvidenceStrength::VeryStrong => "very strong",
            EvidenceStrength::Decisive => "decisive",
        }
    }
}

impl std::fmt::Display for EvidenceStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Which way a likelihood ratio pushes the diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceDirection {
    /// LR > 1
    Supports,
    /// LR < 1
    Refutes,
    Neutral,
}

impl EvidenceDirection {
    pub fn from_likelihood_ratio(likelihood_ratio: f64) -> Self {
        if likelihood_ratio.is_nan() || (likelihood_ratio - 1.0).abs() < f64::EPSILON {
            EvidenceDirection::Neutral
        } else if likelihood_ratio > 1.0 {
            EvidenceDirection::Supports
        } else {
            EvidenceDirection::Refutes
        }
    }
}

/// Everything needed to explain one piece of evidence.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct EvidenceSummary {
    #[serde(with = "crate::math::serde_unbounded")]
    #[schemars(schema_with = "crate::math::serde_unbounded::schema")]
    pub likelihood_ratio: f64,
    /// Natural log of the ratio; `null` on the wire when infinite.
    pub log_lr: f64,
    pub delta_bits: f64,
    pub strength: EvidenceStrength,
    pub direction: EvidenceDirection,
}

impl EvidenceSummary {
    pub fn from_likelihood_ratio(likelihood_ratio: f64) -> Self {
        EvidenceSummary {
            likelihood_ratio,
            log_lr: likelihood_ratio.ln(),
            delta_bits: delta_bits(likelihood_ratio),
            strength: EvidenceStrength::from_likelihood_ratio(likelihood_ratio),
            direction: EvidenceDirection::from_likelihood_ratio(likelihood_ratio),
        }
    }

    /// Check if the evidence reaches at least `min_strength`.
    pub fn is_significant(&self, min_strength: EvidenceStrength) -> bool {
        self.strength >= min_strength
    }
}
