//! Diagnostic Probability Engine core library.
//!
//! This library provides:
//! - Action-tier recommendation and test planning on top of `dpe-math`
//! - The hypothesis ranking store, one differential per clinical problem
//! - The request boundary for untrusted callers (`api`)
//! - Structured logging, output rendering and CLI exit codes
//!
//! The binary entry point is in `main.rs`.

pub mod api;
pub mod decision;
pub mod exit_codes;
pub mod logging;
pub mod output;
pub mod store;

pub use api::{ApiError, Engine, Operation};
pub use decision::{recommend_tier, ActionTier, TierRecommendation};
pub use store::{HypothesisStore, StoreError};
