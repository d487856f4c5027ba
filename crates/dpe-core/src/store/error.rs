//! Store errors.

use crate::store::hypothesis::HypothesisStatus;
use dpe_common::{DiagnosisId, HypothesisId, ProblemId};
use dpe_math::DomainError;
use thiserror::Error;

/// Errors raised by [`HypothesisStore`](crate::store::HypothesisStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("problem {0} not found")]
    ProblemNotFound(ProblemId),

    #[error("hypothesis {0} not found")]
    HypothesisNotFound(HypothesisId),

    #[error("hypothesis {hypothesis_id} is already {status}")]
    AlreadyRetired {
        hypothesis_id: HypothesisId,
        status: HypothesisStatus,
    },

    #[error("problem {0} already exists")]
    DuplicateProblem(ProblemId),

    #[error("diagnosis {diagnosis_id} is already an active hypothesis of problem {problem_id}")]
    DuplicateDiagnosis {
        problem_id: ProblemId,
        diagnosis_id: DiagnosisId,
    },

    #[error("invalid pretest probability for {diagnosis_id} in problem {problem_id}: {source}")]
    InvalidPretest {
        problem_id: ProblemId,
        diagnosis_id: DiagnosisId,
        #[source]
        source: DomainError,
    },

    #[error("evidence for hypothesis {hypothesis_id} in problem {problem_id} rejected: {source}")]
    Evidence {
        problem_id: ProblemId,
        hypothesis_id: HypothesisId,
        #[source]
        source: DomainError,
    },

    #[error("invalid problem record: {0}")]
    InvalidRecord(String),

    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Underlying numeric error, if any.
    pub fn domain_error(&self) -> Option<&DomainError> {
        match self {
            StoreError::InvalidPretest { source, .. } | StoreError::Evidence { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

impl From<StoreError> for dpe_common::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProblemNotFound(problem_id) => {
                dpe_common::Error::ProblemNotFound { problem_id }
            }
            StoreError::HypothesisNotFound(hypothesis_id) => {
                dpe_common::Error::HypothesisNotFound { hypothesis_id }
            }
            StoreError::AlreadyRetired {
                hypothesis_id,
                status,
            } => dpe_common::Error::AlreadyRetired {
                hypothesis_id,
                status: status.to_string(),
            },
            StoreError::DuplicateProblem(problem_id) => {
                dpe_common::Error::DuplicateProblem { problem_id }
            }
            StoreError::DuplicateDiagnosis { diagnosis_id, .. } => {
                dpe_common::Error::InvalidField {
                    field: "diagnosis_id".to_string(),
                    message: format!("{} is already under consideration", diagnosis_id),
                }
            }
            StoreError::InvalidPretest { source, .. } | StoreError::Evidence { source, .. } => {
                dpe_common::Error::Domain(source)
            }
            StoreError::InvalidRecord(message) => dpe_common::Error::MalformedRequest(message),
            StoreError::LockPoisoned(message) => dpe_common::Error::Internal(message),
        }
    }
}
