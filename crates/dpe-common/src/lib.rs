//! Diagnostic probability engine common types, IDs, and errors.
//!
//! This crate provides foundational types shared across dpe-core modules:
//! - Problem, hypothesis and diagnosis identifiers
//! - The unified error type with stable codes
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;

pub use error::{Error, ErrorCategory, Result, StructuredError, SuggestedAction};
pub use id::{DiagnosisId, HypothesisId, ProblemId};
pub use output::OutputFormat;
