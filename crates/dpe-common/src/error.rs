//! Error types for the diagnostic probability engine.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification matching the engine's taxonomy
//!   (configuration, request validation, numeric domain, hypothesis state)
//! - Recoverability hints and remediation suggestions
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Value Out of Range
//!   Reason: prior_probability must be in [0, 1], got 1.3
//!   Fix: Supply probabilities, sensitivity and specificity in [0, 1] ...
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 30,
//!   "category": "domain",
//!   "message": "prior_probability must be in [0, 1], got 1.3",
//!   "recoverable": true,
//!   "suggested_action": "fix_input",
//!   "context": { "field": "prior_probability" }
//! }
//! ```

use crate::id::{HypothesisId, ProblemId};
use dpe_math::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Policy configuration errors (thresholds, presets, files).
    Config,
    /// Malformed or incomplete requests at the boundary.
    Validation,
    /// Numeric input outside its valid range.
    Domain,
    /// Unknown or retired problems and hypotheses.
    State,
    /// File I/O and serialization errors.
    Io,
    /// Engine faults (poisoned locks). Should be reported.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Domain => write!(f, "domain"),
            ErrorCategory::State => write!(f, "state"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

/// Suggested actions for callers to take in response to errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Correct the offending input and resubmit.
    FixInput,
    /// Reset configuration to defaults.
    ResetConfig,
    /// Run the config validation command.
    RunCheck,
    /// Re-read the problem to pick up current hypothesis ids and states.
    Refresh,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::ResetConfig => write!(f, "reset_config"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::Refresh => write!(f, "refresh"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    // Request validation errors (20-29)
    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("invalid value for {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    // Domain errors (30-39)
    #[error("{0}")]
    Domain(#[from] DomainError),

    // State errors (40-49)
    #[error("problem {problem_id} not found")]
    ProblemNotFound { problem_id: ProblemId },

    #[error("hypothesis {hypothesis_id} not found")]
    HypothesisNotFound { hypothesis_id: HypothesisId },

    #[error("hypothesis {hypothesis_id} is already {status}")]
    AlreadyRetired {
        hypothesis_id: HypothesisId,
        status: String,
    },

    #[error("problem {problem_id} already exists")]
    DuplicateProblem { problem_id: ProblemId },

    #[error("{path} is locked by another writer")]
    RecordLocked { path: String },

    // Internal errors (50-59)
    #[error("internal error: {0}")]
    Internal(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Request validation errors
    /// - 30-39: Domain errors
    /// - 40-49: Hypothesis state errors
    /// - 50-59: Internal errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidPolicy(_) => 11,
            Error::UnknownPreset(_) => 12,
            Error::MissingField { .. } => 20,
            Error::InvalidField { .. } => 21,
            Error::MalformedRequest(_) => 22,
            Error::Domain(_) => 30,
            Error::ProblemNotFound { .. } => 40,
            Error::HypothesisNotFound { .. } => 41,
            Error::AlreadyRetired { .. } => 42,
            Error::DuplicateProblem { .. } => 43,
            Error::RecordLocked { .. } => 44,
            Error::Internal(_) => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidPolicy(_) | Error::UnknownPreset(_) => {
                ErrorCategory::Config
            }

            Error::MissingField { .. } | Error::InvalidField { .. } | Error::MalformedRequest(_) => {
                ErrorCategory::Validation
            }

            Error::Domain(_) => ErrorCategory::Domain,

            Error::ProblemNotFound { .. }
            | Error::HypothesisNotFound { .. }
            | Error::AlreadyRetired { .. }
            | Error::DuplicateProblem { .. }
            | Error::RecordLocked { .. } => ErrorCategory::State,

            Error::Internal(_) => ErrorCategory::Internal,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error can be resolved by the caller.
    ///
    /// Only a locked record is transient; everything else needs a changed
    /// request before a retry can succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::InvalidPolicy(_) | Error::UnknownPreset(_) => true,
            Error::MissingField { .. } | Error::InvalidField { .. } | Error::MalformedRequest(_) => {
                true
            }
            Error::Domain(_) => true,
            Error::ProblemNotFound { .. } | Error::HypothesisNotFound { .. } => true,
            // Retirement is irreversible.
            Error::AlreadyRetired { .. } => false,
            Error::DuplicateProblem { .. } => true,
            Error::RecordLocked { .. } => true,
            Error::Internal(_) => false,
            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns the suggested action for callers.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::InvalidPolicy(_) => SuggestedAction::ResetConfig,
            Error::UnknownPreset(_) => SuggestedAction::FixInput,

            Error::MissingField { .. } | Error::InvalidField { .. } | Error::MalformedRequest(_) => {
                SuggestedAction::FixInput
            }

            Error::Domain(_) => SuggestedAction::FixInput,

            Error::ProblemNotFound { .. }
            | Error::HypothesisNotFound { .. }
            | Error::AlreadyRetired { .. }
            | Error::DuplicateProblem { .. }
            | Error::RecordLocked { .. } => SuggestedAction::Refresh,

            Error::Internal(_) => SuggestedAction::ManualIntervention,

            Error::Io(_) => SuggestedAction::ManualIntervention,
            Error::Json(_) => SuggestedAction::FixInput,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Run 'dpe config validate' to check the policy file.",
            Error::InvalidPolicy(_) => {
                "Fix the policy file so that 0 <= test_threshold < treatment_threshold <= 1, or remove it to use defaults."
            }
            Error::UnknownPreset(_) => "List available presets with 'dpe config presets'.",

            Error::MissingField { .. } => "Every request field is required; no defaults are assumed.",
            Error::InvalidField { .. } => "Send numbers as JSON numbers or decimal strings.",
            Error::MalformedRequest(_) => "Check the request body against 'dpe schema <request>'.",

            Error::Domain(_) => {
                "Supply probabilities, sensitivity and specificity in [0, 1] and non-negative likelihood ratios."
            }

            Error::ProblemNotFound { .. } => "Open the problem before proposing hypotheses.",
            Error::HypothesisNotFound { .. } => "List the problem's ranked hypotheses to get current ids.",
            Error::AlreadyRetired { .. } => {
                "Retired hypotheses cannot receive evidence. Propose a new hypothesis if the diagnosis is reconsidered."
            }
            Error::DuplicateProblem { .. } => "Use the existing problem or import under a new id.",
            Error::RecordLocked { .. } => {
                "Retry once the other update finishes. If no dpe process is running, delete the stale .lock file."
            }

            Error::Internal(_) => "Restart the engine and report the failing request.",

            Error::Io(_) => "Check that the file exists and is readable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq .'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidPolicy(_) => "Invalid Policy Configuration",
            Error::UnknownPreset(_) => "Unknown Preset",

            Error::MissingField { .. } => "Missing Required Field",
            Error::InvalidField { .. } => "Invalid Field",
            Error::MalformedRequest(_) => "Malformed Request",

            Error::Domain(_) => "Value Out of Range",

            Error::ProblemNotFound { .. } => "Problem Not Found",
            Error::HypothesisNotFound { .. } => "Hypothesis Not Found",
            Error::AlreadyRetired { .. } => "Hypothesis Already Retired",
            Error::DuplicateProblem { .. } => "Duplicate Problem",
            Error::RecordLocked { .. } => "Record Locked",

            Error::Internal(_) => "Internal Error",

            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }

    /// Format for a terminal: headline, reason, fix.
    pub fn to_human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error can be resolved by the caller.
    pub recoverable: bool,

    /// Suggested action for callers.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., field name, hypothesis id).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::MissingField { field } | Error::InvalidField { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            Error::Domain(domain) => {
                if let Some(field) = domain.field() {
                    context.insert("field".to_string(), serde_json::json!(field));
                }
            }
            Error::ProblemNotFound { problem_id } | Error::DuplicateProblem { problem_id } => {
                context.insert("problem_id".to_string(), serde_json::json!(problem_id));
            }
            Error::HypothesisNotFound { hypothesis_id } => {
                context.insert("hypothesis_id".to_string(), serde_json::json!(hypothesis_id));
            }
            Error::AlreadyRetired {
                hypothesis_id,
                status,
            } => {
                context.insert("hypothesis_id".to_string(), serde_json::json!(hypothesis_id));
                context.insert("status".to_string(), serde_json::json!(status));
            }
            Error::RecordLocked { path } => {
                context.insert("path".to_string(), serde_json::json!(path));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}
