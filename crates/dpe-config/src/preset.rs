//! Policy presets for common clinical risk postures.
//!
//! - Default: classical 5% / 90% test and treatment thresholds
//! - RuleOut: can't-miss diagnoses; keep testing down to 1%
//! - Conservative: risky or costly treatment; demand 97% before treating

use crate::policy::{Policy, StorePolicy, TierThresholds};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available policy presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresetName {
    Default,
    RuleOut,
    Conservative,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] = &[
        PresetName::Default,
        PresetName::RuleOut,
        PresetName::Conservative,
    ];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Default => "default",
            PresetName::RuleOut => "rule-out",
            PresetName::Conservative => "conservative",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "default" | "standard" => Some(PresetName::Default),
            "rule-out" | "ruleout" | "rule_out" | "cant-miss" => Some(PresetName::RuleOut),
            "conservative" | "cautious" => Some(PresetName::Conservative),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Default => "Classical test/treatment thresholds (5% / 90%)",
            PresetName::RuleOut => {
                "Can't-miss diagnoses: keep testing down to 1%, treat from 80%"
            }
            PresetName::Conservative => {
                "Risky or costly treatment: test from 10%, treat only from 97%"
            }
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| format!("unknown preset: {}", s))
    }
}

/// Summary of a preset for listing.
#[derive(Debug, Clone, Serialize)]
pub struct PresetInfo {
    pub name: PresetName,
    pub description: &'static str,
    pub thresholds: TierThresholds,
}

/// Build the policy for a preset.
pub fn get_preset(name: PresetName) -> Policy {
    match name {
        PresetName::Default => Policy::default(),
        PresetName::RuleOut => Policy {
            policy_id: Some("rule-out".to_string()),
            description: Some(name.description().to_string()),
            thresholds: TierThresholds {
                test_threshold: 0.01,
                treatment_threshold: 0.80,
            },
            store: StorePolicy {
                elimination_floor: 0.0005,
                confirmation_ceiling: None,
            },
            ..Policy::default()
        },
        PresetName::Conservative => Policy {
            policy_id: Some("conservative".to_string()),
            description: Some(name.description().to_string()),
            thresholds: TierThresholds {
                test_threshold: 0.10,
                treatment_threshold: 0.97,
            },
            store: StorePolicy {
                elimination_floor: 0.005,
                confirmation_ceiling: Some(0.995),
            },
            ..Policy::default()
        },
    }
}

/// List every preset with its thresholds.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|&name| PresetInfo {
            name,
            description: name.description(),
            thresholds: get_preset(name).thresholds,
        })
        .collect()
}
