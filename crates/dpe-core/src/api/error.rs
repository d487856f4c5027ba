//! Boundary errors and their HTTP-style status.

use dpe_common::{Error, StructuredError};
use dpe_math::DomainError;
use thiserror::Error as ThisError;

/// A rejected request. Never carries a fallback numeric result.
#[derive(Debug, ThisError)]
pub enum ApiError {
    /// Missing, unparseable or malformed input (400).
    #[error("{0}")]
    Validation(Error),

    /// Parsed input outside its numeric domain (422).
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// The engine's own policy is unusable (500).
    #[error("{0}")]
    Configuration(Error),
}

impl ApiError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        ApiError::Validation(Error::MissingField {
            field: field.into(),
        })
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(Error::InvalidField {
            field: field.into(),
            message: message.into(),
        })
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ApiError::Validation(Error::MalformedRequest(message.into()))
    }

    /// Classify a body deserialisation failure.
    pub fn from_json_error(err: &serde_json::Error) -> Self {
        let message = err.to_string();
        if let Some(rest) = message.strip_prefix("missing field `") {
            if let Some((field, _)) = rest.split_once('`') {
                return ApiError::missing_field(field);
            }
        }
        ApiError::malformed(message)
    }

    /// HTTP-equivalent status for transports that want one.
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 400,
            ApiError::Domain(_) => 422,
            ApiError::Configuration(_) => 500,
        }
    }

    /// Structured body for the rejected request.
    pub fn to_structured(&self) -> StructuredError {
        let structured = match self {
            ApiError::Validation(err) | ApiError::Configuration(err) => StructuredError::from(err),
            ApiError::Domain(domain) => StructuredError::from(&Error::Domain(domain.clone())),
        };
        structured.with_context("http_status", self.http_status())
    }

    pub fn into_error(self) -> Error {
        match self {
            ApiError::Validation(err) | ApiError::Configuration(err) => err,
            ApiError::Domain(domain) => Error::Domain(domain),
        }
    }
}
