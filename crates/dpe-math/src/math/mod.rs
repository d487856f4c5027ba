//! Core math modules.

pub mod evidence;
pub mod likelihood;
pub mod odds;
pub mod planner;
pub mod serde_unbounded;
pub mod update;
