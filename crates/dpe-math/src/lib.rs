//! Diagnostic probability math.
//!
//! Pure, stateless kernels shared by every caller of the engine:
//! - Probability/odds conversion with the +inf certainty sentinel
//! - Likelihood ratios from sensitivity/specificity
//! - Single-step and sequential Bayesian updates
//! - Dual-outcome planning ahead of a test
//! - Evidence strength labels for explainability

pub mod error;
pub mod math;

pub use error::{DomainError, Result};
pub use math::evidence;
pub use math::likelihood::*;
pub use math::odds::*;
pub use math::planner::*;
pub use math::update::*;
