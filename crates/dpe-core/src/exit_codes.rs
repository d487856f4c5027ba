//! Exit codes for the `dpe` CLI.
//!
//! Exit code ranges:
//! - 0: Success
//! - 10-19: Caller errors (fix the input or configuration and rerun)
//! - 20-29: Internal errors (bugs, should be reported)

use crate::api::ApiError;
use dpe_common::{Error, ErrorCategory};

/// Exit codes for dpe operations.
///
/// These codes are a stable contract for automation. Changes require
/// a major version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    // ========================================================================
    // Caller Errors (10-19)
    // ========================================================================
    /// Invalid arguments or request body
    ArgsError = 10,

    /// Numeric input outside its domain
    DomainError = 11,

    /// Invalid or unreadable policy configuration
    ConfigError = 12,

    /// Unknown or retired hypothesis/problem
    StateError = 13,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Check if this exit code is a caller error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::DomainError => "ERR_DOMAIN",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::StateError => "ERR_STATE",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Validation => ExitCode::ArgsError,
            ErrorCategory::Domain => ExitCode::DomainError,
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::State => ExitCode::StateError,
            ErrorCategory::Io => ExitCode::IoError,
            ErrorCategory::Internal => ExitCode::InternalError,
        }
    }
}

impl From<&ApiError> for ExitCode {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Validation(_) => ExitCode::ArgsError,
            ApiError::Domain(_) => ExitCode::DomainError,
            ApiError::Configuration(_) => ExitCode::ConfigError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpe_common::HypothesisId;
    use dpe_math::DomainError;

    #[test]
    fn ranges() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::DomainError.is_user_error());
        assert!(!ExitCode::IoError.is_user_error());
        assert!(ExitCode::IoError.is_internal_error());
        assert_eq!(ExitCode::ConfigError.to_string(), "ERR_CONFIG (12)");
    }

    #[test]
    fn errors_map_by_category() {
        let domain = Error::Domain(DomainError::NotANumber { field: "p" });
        assert_eq!(ExitCode::from(&domain), ExitCode::DomainError);
        let state = Error::HypothesisNotFound {
            hypothesis_id: HypothesisId::new(),
        };
        assert_eq!(ExitCode::from(&state), ExitCode::StateError);
        assert_eq!(
            ExitCode::from(&Error::UnknownPreset("x".into())),
            ExitCode::ConfigError
        );
        assert_eq!(
            ExitCode::from(&ApiError::missing_field("sensitivity")),
            ExitCode::ArgsError
        );
    }
}
