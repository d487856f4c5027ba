//! Policy validation errors and semantic validation.

use std::collections::HashSet;
use thiserror::Error;

use crate::policy::{Policy, StorePolicy, TierThresholds};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Policy validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate a policy semantically.
pub fn validate_policy(policy: &Policy) -> ValidationResult<()> {
    if policy.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: policy.schema_version.clone(),
        });
    }

    validate_thresholds(&policy.thresholds)?;
    validate_store(&policy.store)?;
    validate_catalog(policy)?;

    Ok(())
}

fn validate_thresholds(thresholds: &TierThresholds) -> ValidationResult<()> {
    validate_unit("thresholds.test_threshold", thresholds.test_threshold)?;
    validate_unit(
        "thresholds.treatment_threshold",
        thresholds.treatment_threshold,
    )?;

    if thresholds.test_threshold >= thresholds.treatment_threshold {
        return Err(ValidationError::SemanticError(format!(
            "test_threshold ({}) must be below treatment_threshold ({})",
            thresholds.test_threshold, thresholds.treatment_threshold
        )));
    }

    Ok(())
}

pub(crate) fn validate_store(store: &StorePolicy) -> ValidationResult<()> {
    validate_unit("store.elimination_floor", store.elimination_floor)?;
    if store.elimination_floor >= 1.0 {
        return Err(ValidationError::InvalidValue {
            field: "store.elimination_floor".to_string(),
            message: "Must be below 1 or every hypothesis is ruled out".to_string(),
        });
    }

    if let Some(ceiling) = store.confirmation_ceiling {
        validate_unit("store.confirmation_ceiling", ceiling)?;
        if ceiling <= store.elimination_floor {
            return Err(ValidationError::SemanticError(format!(
                "confirmation_ceiling ({}) must be above elimination_floor ({})",
                ceiling, store.elimination_floor
            )));
        }
    }

    Ok(())
}

fn validate_catalog(policy: &Policy) -> ValidationResult<()> {
    let mut seen = HashSet::new();
    for (idx, test) in policy.test_catalog.iter().enumerate() {
        let name = test.name.trim();
        if name.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("test_catalog[{}].name", idx),
                message: "Must not be blank".to_string(),
            });
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ValidationError::SemanticError(format!(
                "duplicate test_catalog entry: {}",
                name
            )));
        }
        validate_unit(
            &format!("test_catalog.{}.sensitivity", name),
            test.sensitivity,
        )?;
        validate_unit(
            &format!("test_catalog.{}.specificity", name),
            test.specificity,
        )?;
    }
    Ok(())
}

fn validate_unit(field: &str, value: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be in [0, 1], got {}", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::CatalogTest;

    #[test]
    fn default_policy_is_valid() {
        assert!(validate_policy(&Policy::default()).is_ok());
    }

    #[test]
    fn rejects_wrong_schema_version() {
        let policy = Policy {
            schema_version: "0.9.0".to_string(),
            ..Policy::default()
        };
        assert!(matches!(
            validate_policy(&policy),
            Err(ValidationError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut policy = Policy::default();
        policy.thresholds.test_threshold = 0.95;
        let err = validate_policy(&policy).unwrap_err();
        assert_eq!(err.code(), 63);
    }

    #[test]
    fn rejects_nan_threshold() {
        let mut policy = Policy::default();
        policy.thresholds.treatment_threshold = f64::NAN;
        assert!(matches!(
            validate_policy(&policy),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_ceiling_below_floor() {
        let mut policy = Policy::default();
        policy.store.elimination_floor = 0.1;
        policy.store.confirmation_ceiling = Some(0.05);
        assert!(validate_policy(&policy).is_err());
    }

    #[test]
    fn rejects_duplicate_catalog_entries() {
        let mut policy = Policy::default();
        let test = CatalogTest {
            name: "Troponin".to_string(),
            sensitivity: 0.9,
            specificity: 0.9,
            notes: None,
        };
        policy.test_catalog = vec![
            test.clone(),
            CatalogTest {
                name: "troponin".to_string(),
                ..test
            },
        ];
        assert!(matches!(
            validate_policy(&policy),
            Err(ValidationError::SemanticError(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_catalog_values() {
        let mut policy = Policy::default();
        policy.test_catalog.push(CatalogTest {
            name: "ecg".to_string(),
            sensitivity: 1.2,
            specificity: 0.9,
            notes: None,
        });
        let err = validate_policy(&policy).unwrap_err();
        assert!(err.to_string().contains("test_catalog.ecg.sensitivity"));
    }
}
