// Terminal outcomes of a refresh run and failures of the read-only query path

use crate::sources::SourceKind;
use crate::store::StoreError;
use crate::summary::ReportError;
use crate::validation::ValidationError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which of the two independent commit units failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    Insert,
    Update,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Insert => write!(f, "insert"),
            BatchKind::Update => write!(f, "update"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    /// A fetch timed out, failed in transport, or returned an unusable body.
    /// Nothing from the run was committed.
    #[error("External data source unavailable: could not fetch {origin} from {endpoint} ({detail})")]
    ExternalSourceUnavailable {
        origin: SourceKind,
        endpoint: String,
        detail: String,
    },

    /// Only raised under the abort policy; nothing from the run was committed.
    #[error("Validation failed for '{name}': {error}")]
    ValidationFailed { name: String, error: ValidationError },

    /// The named batch rolled back. A batch committed before it stays applied.
    #[error("Could not commit {batch} batch: {cause}")]
    StoreCommitFailed {
        batch: BatchKind,
        #[source]
        cause: StoreError,
    },

    /// Store lookup failed while classifying; nothing was committed.
    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Country not found: {name}")]
    RecordNotFound { name: String },

    #[error("Summary image not found")]
    ArtifactNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Artifact(ReportError),
}

impl From<ReportError> for QueryError {
    fn from(error: ReportError) -> Self {
        match error {
            ReportError::NotFound => QueryError::ArtifactNotFound,
            other => QueryError::Artifact(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_message_names_source() {
        let err = RefreshError::ExternalSourceUnavailable {
            origin: SourceKind::ExchangeRates,
            endpoint: "open.er-api.com".to_string(),
            detail: "request timed out after 10s".to_string(),
        };
        let message = err.to_string();

        assert!(message.contains("exchange rates"));
        assert!(message.contains("open.er-api.com"));
    }

    #[test]
    fn test_missing_artifact_maps_to_not_found() {
        assert!(matches!(
            QueryError::from(ReportError::NotFound),
            QueryError::ArtifactNotFound
        ));
    }

    #[test]
    fn test_commit_failure_keeps_cause() {
        let err = RefreshError::StoreCommitFailed {
            batch: BatchKind::Update,
            cause: StoreError::LockPoisoned,
        };
        assert_eq!(err.to_string(), "Could not commit update batch: store lock poisoned");
        assert!(std::error::Error::source(&err).is_some());
    }
}
