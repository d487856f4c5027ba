//! Decision policy types.
//!
//! A policy file may be JSON or TOML; the extension picks the parser.

use dpe_math::{validate_probability, DomainError, TestCharacteristics};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::{ValidationError, ValidationResult};

/// Complete decision policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Policy {
    pub schema_version: String,

    #[serde(default)]
    pub policy_id: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub thresholds: TierThresholds,

    #[serde(default)]
    pub store: StorePolicy,

    /// Named tests with fixed operating characteristics.
    #[serde(default)]
    pub test_catalog: Vec<CatalogTest>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            policy_id: Some("default".to_string()),
            description: Some("Classical test/treatment thresholds".to_string()),
            thresholds: TierThresholds::default(),
            store: StorePolicy::default(),
            test_catalog: Vec::new(),
            notes: None,
        }
    }
}

impl Policy {
    /// Load a policy from a `.json` or `.toml` file.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// Parse a policy from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(content).map_err(|e| ValidationError::ParseError(e.to_string()))
    }

    /// Parse a policy from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ValidationError> {
        toml::from_str(content).map_err(|e| ValidationError::ParseError(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate semantically.
    pub fn validate(&self) -> Result<(), ValidationError> {
        crate::validate::validate_policy(self)
    }

    /// Look up a catalog test by name (case-insensitive).
    pub fn find_test(&self, name: &str) -> Option<&CatalogTest> {
        self.test_catalog
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }
}

/// Test and treatment thresholds for the action-tier recommender.
///
/// Must satisfy `0 <= test_threshold < treatment_threshold <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TierThresholds {
    /// Below this probability no further workup is justified.
    pub test_threshold: f64,
    /// At or above this probability treat without further testing.
    pub treatment_threshold: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            test_threshold: 0.05,
            treatment_threshold: 0.90,
        }
    }
}

impl TierThresholds {
    /// Build checked thresholds.
    pub fn new(test_threshold: f64, treatment_threshold: f64) -> Result<Self, DomainError> {
        let thresholds = Self {
            test_threshold,
            treatment_threshold,
        };
        thresholds.check()?;
        Ok(thresholds)
    }

    /// Verify ordering and bounds.
    pub fn check(&self) -> Result<(), DomainError> {
        validate_probability("test_threshold", self.test_threshold)?;
        validate_probability("treatment_threshold", self.treatment_threshold)?;
        if self.test_threshold >= self.treatment_threshold {
            return Err(DomainError::UnorderedThresholds {
                test: self.test_threshold,
                treatment: self.treatment_threshold,
            });
        }
        Ok(())
    }
}

/// Automatic state transitions in the hypothesis store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StorePolicy {
    /// Active hypotheses whose probability drops below this are ruled out.
    pub elimination_floor: f64,
    /// Active hypotheses reaching this probability are confirmed. `None` disables.
    #[serde(default)]
    pub confirmation_ceiling: Option<f64>,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            elimination_floor: 0.001,
            confirmation_ceiling: None,
        }
    }
}

impl StorePolicy {
    /// Verify the floor and ceiling leave room for an active hypothesis.
    pub fn check(&self) -> ValidationResult<()> {
        crate::validate::validate_store(self)
    }
}

/// A diagnostic test with fixed sensitivity and specificity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogTest {
    pub name: String,
    pub sensitivity: f64,
    pub specificity: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CatalogTest {
    /// Checked operating characteristics of this test.
    pub fn characteristics(&self) -> Result<TestCharacteristics, DomainError> {
        TestCharacteristics::new(self.sensitivity, self.specificity)
    }
}
