//! Structured event vocabulary.
//!
//! Every event carries an `event` field from [`event_names`] and a `stage`,
//! so JSONL consumers can filter without parsing messages.

use serde::{Deserialize, Serialize};

/// Processing stages in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and policy loading.
    Init,
    /// Request parsing and validation at the boundary.
    Request,
    /// Pure probability calculations.
    Calculate,
    /// Tier recommendation and test planning.
    Decide,
    /// Hypothesis store mutations.
    Store,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Request => "request",
            Stage::Calculate => "calculate",
            Stage::Decide => "decide",
            Stage::Store => "store",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    // Request boundary
    pub const REQUEST_ACCEPTED: &str = "request.accepted";
    pub const REQUEST_REJECTED: &str = "request.rejected";

    // Decisions
    pub const DECIDE_TIER: &str = "decide.tier";
    pub const DECIDE_TEST_PLAN: &str = "decide.test_plan";

    // Store
    pub const STORE_PROBLEM_OPENED: &str = "store.problem_opened";
    pub const STORE_PROBLEM_IMPORTED: &str = "store.problem_imported";
    pub const STORE_PROBLEM_CLOSED: &str = "store.problem_closed";
    pub const STORE_HYPOTHESIS_PROPOSED: &str = "store.hypothesis_proposed";
    pub const STORE_EVIDENCE_RECORDED: &str = "store.evidence_recorded";
    pub const STORE_EVIDENCE_REJECTED: &str = "store.evidence_rejected";
    pub const STORE_STATUS_CHANGED: &str = "store.status_changed";
    pub const STORE_RERANKED: &str = "store.reranked";
    pub const STORE_RECORD_LOCKED: &str = "store.record_locked";
    pub const STORE_RECORD_WRITTEN: &str = "store.record_written";

    // Error events
    pub const INTERNAL_ERROR: &str = "internal_error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display_matches_serde() {
        for stage in [
            Stage::Init,
            Stage::Request,
            Stage::Calculate,
            Stage::Decide,
            Stage::Store,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json.trim_matches('"'), stage.to_string());
        }
    }

    #[test]
    fn event_names_are_dotted() {
        for name in [
            event_names::RUN_STARTED,
            event_names::REQUEST_REJECTED,
            event_names::STORE_EVIDENCE_RECORDED,
        ] {
            assert!(name.contains('.'), "{name}");
        }
    }
}
