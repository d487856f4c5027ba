//! Diagnostic probability engine policy loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the decision policy (tier thresholds, store
//!   elimination rules, the diagnostic test catalog)
//! - Built-in presets
//! - Policy resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation
//! - Policy snapshots for auditing recommendations

pub mod policy;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use policy::{CatalogTest, Policy, StorePolicy, TierThresholds};
pub use preset::{get_preset, list_presets, PresetInfo, PresetName};
pub use resolve::{load_policy, resolve_policy_path, ConfigSource, LoadedPolicy, PolicyPath};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_policy, ValidationError, ValidationResult};

/// Schema version for policy files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
