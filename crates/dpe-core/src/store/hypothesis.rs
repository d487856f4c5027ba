//! Hypothesis records owned by the store.

use chrono::{DateTime, Utc};
use dpe_common::{DiagnosisId, HypothesisId, ProblemId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a hypothesis. `RuledOut` and `Confirmed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisStatus {
    Active,
    RuledOut,
    Confirmed,
}

impl HypothesisStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, HypothesisStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HypothesisStatus::Active => "active",
            HypothesisStatus::RuledOut => "ruled_out",
            HypothesisStatus::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for HypothesisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state requested by an explicit retirement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum RetireOutcome {
    RuledOut,
    Confirmed,
}

impl From<RetireOutcome> for HypothesisStatus {
    fn from(outcome: RetireOutcome) -> Self {
        match outcome {
            RetireOutcome::RuledOut => HypothesisStatus::RuledOut,
            RetireOutcome::Confirmed => HypothesisStatus::Confirmed,
        }
    }
}

/// Observed result of a diagnostic test.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Positive,
    Negative,
}

/// One applied likelihood ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvidenceRecord {
    #[serde(with = "dpe_math::math::serde_unbounded")]
    #[schemars(schema_with = "dpe_math::math::serde_unbounded::schema")]
    pub likelihood_ratio: f64,
    pub prior: f64,
    pub posterior: f64,
    pub recorded_at: DateTime<Utc>,
}

/// A candidate diagnosis for one problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Hypothesis {
    pub id: HypothesisId,
    pub problem_id: ProblemId,
    pub diagnosis_id: DiagnosisId,
    pub pretest_probability: f64,
    pub current_probability: f64,
    /// 1-based position among active hypotheses; `None` once retired.
    pub rank: Option<usize>,
    pub status: HypothesisStatus,
    /// Creation order within the problem; breaks probability ties.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub evidence: Vec<EvidenceRecord>,
}

impl Hypothesis {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Serializable copy of a whole problem, for the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProblemRecord {
    pub problem_id: ProblemId,
    pub created_at: DateTime<Utc>,
    /// Every hypothesis, active or retired, in creation order.
    pub hypotheses: Vec<Hypothesis>,
}

/// Active hypotheses of one problem in rank order, as of one instant.
///
/// The snapshot is detached from the store: iterating it any number of
/// times yields the same sequence and never blocks writers.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct RankedHypotheses {
    pub problem_id: ProblemId,
    entries: Vec<Hypothesis>,
}

impl RankedHypotheses {
    pub(crate) fn new(problem_id: ProblemId, entries: Vec<Hypothesis>) -> Self {
        Self {
            problem_id,
            entries,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hypothesis> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest-ranked active hypothesis.
    pub fn leading(&self) -> Option<&Hypothesis> {
        self.entries.first()
    }

    /// Hypothesis at a 1-based rank.
    pub fn at_rank(&self, rank: usize) -> Option<&Hypothesis> {
        rank.checked_sub(1).and_then(|idx| self.entries.get(idx))
    }

    pub fn into_vec(self) -> Vec<Hypothesis> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a RankedHypotheses {
    type Item = &'a Hypothesis;
    type IntoIter = std::slice::Iter<'a, Hypothesis>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for RankedHypotheses {
    type Item = Hypothesis;
    type IntoIter = std::vec::IntoIter<Hypothesis>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
