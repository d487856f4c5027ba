//! Policy snapshots for auditing recommendations.
//!
//! A snapshot records exactly which thresholds were active and where they
//! came from, so a recommendation can be reproduced later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::policy::{Policy, StorePolicy, TierThresholds};
use crate::resolve::PolicyPath;

/// A frozen snapshot of policy state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the policy.
    pub schema_version: String,

    #[serde(default)]
    pub policy_id: Option<String>,

    /// Source of the policy.
    pub policy_source: String,

    /// Path where the policy was loaded from.
    #[serde(default)]
    pub policy_path: Option<String>,

    /// SHA-256 of the file content, or of the canonical JSON for built-in policies.
    pub policy_hash: String,

    pub thresholds: TierThresholds,
    pub store: StorePolicy,
    pub catalog_size: usize,
}

impl ConfigSnapshot {
    /// Create a snapshot from a loaded policy.
    ///
    /// `content` is the raw file text when the policy came from disk.
    pub fn new(policy: &Policy, resolved: &PolicyPath, content: Option<&str>) -> Self {
        let policy_hash = match content {
            Some(text) => hash_content(text),
            None => hash_content(&serde_json::to_string(policy).unwrap_or_default()),
        };

        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: policy.schema_version.clone(),
            policy_id: policy.policy_id.clone(),
            policy_source: resolved.source.to_string(),
            policy_path: resolved.path.as_ref().map(|p| p.display().to_string()),
            policy_hash,
            thresholds: policy.thresholds,
            store: policy.store,
            catalog_size: policy.test_catalog.len(),
        }
    }

    /// Snapshot of the built-in default policy.
    pub fn defaults_only() -> Self {
        Self::new(&Policy::default(), &PolicyPath::default(), None)
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this snapshot matches another (same policy content).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.policy_hash == other.policy_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.policy_hash[..12.min(self.policy_hash.len())]
    }
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
