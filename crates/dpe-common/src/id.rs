//! Problem, hypothesis and diagnosis identity types.
//!
//! Problems and hypotheses are minted by the engine (UUID v4). Diagnoses are
//! named by the caller's differential generator; the engine never invents one.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a clinical problem whose differential is being worked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProblemId(pub Uuid);

impl ProblemId {
    pub fn new() -> Self {
        ProblemId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(ProblemId)
    }
}

impl Default for ProblemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProblemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(ProblemId)
    }
}

/// Identifier of one candidate diagnosis within a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct HypothesisId(pub Uuid);

impl HypothesisId {
    pub fn new() -> Self {
        HypothesisId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(HypothesisId)
    }
}

impl Default for HypothesisId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HypothesisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HypothesisId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(HypothesisId)
    }
}

/// Caller-supplied diagnosis identity (a code or a name).
///
/// Must be non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct DiagnosisId(String);

impl DiagnosisId {
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(DiagnosisId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DiagnosisId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DiagnosisId::parse(&value).ok_or_else(|| "diagnosis id must not be blank".to_string())
    }
}

impl From<DiagnosisId> for String {
    fn from(id: DiagnosisId) -> Self {
        id.0
    }
}

impl fmt::Display for DiagnosisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_id_round_trips_through_display() {
        let id = ProblemId::new();
        let parsed = ProblemId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id, id.to_string().parse::<ProblemId>().unwrap());
    }

    #[test]
    fn hypothesis_ids_are_unique() {
        assert_ne!(HypothesisId::new(), HypothesisId::new());
        assert!(HypothesisId::parse("not-a-uuid").is_none());
    }

    #[test]
    fn hypothesis_id_serializes_transparently() {
        let id = HypothesisId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn diagnosis_id_rejects_blank() {
        assert!(DiagnosisId::parse("   ").is_none());
        assert_eq!(
            DiagnosisId::parse("  pulmonary embolism ").unwrap().as_str(),
            "pulmonary embolism"
        );
        assert!(serde_json::from_str::<DiagnosisId>("\"\"").is_err());
    }
}
