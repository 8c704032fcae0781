//! # Errors
//!
//! Error taxonomy surfaced by the store and by regional backends.
//!
//! Regional adapters return [`BackendError`]. The multi-region store never
//! swallows those: it aggregates the per-region outcomes of an operation and
//! classifies them into a single [`StoreError`].

use crate::model::SecretIdentifier;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a single regional backend call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("name not found: {name}")]
    NotFound { name: String },

    #[error("version {version} not found for name: {name}")]
    VersionNotFound { name: String, version: u64 },

    #[error("name already exists: {name}")]
    AlreadyExists { name: String },

    #[error("malformed version for {name}: {detail}")]
    MalformedVersion { name: String, detail: String },

    #[error("regional call did not complete within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("backend service error: {0}")]
    Service(String),
}

impl BackendError {
    /// True when the region answered that the name does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound { .. })
    }
}

/// Store operation that mutates regional state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`SecretStore`](crate::store::SecretStore) operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("identifier not found: {identifier}")]
    IdentifierNotFound { identifier: SecretIdentifier },

    #[error("identifier already exists: {identifier} (present in: {})", .regions.join(", "))]
    IdentifierAlreadyExists {
        identifier: SecretIdentifier,
        regions: Vec<String>,
    },

    #[error("version {version} not found for identifier: {identifier}")]
    VersionNotFound {
        identifier: SecretIdentifier,
        version: i64,
    },

    #[error("invalid identifier '{input}': {reason}")]
    InvalidIdentifier { input: String, reason: String },

    /// The backend returned version markers that cannot be mapped onto a dense history
    #[error("malformed version data for {identifier} in {region}: {detail}")]
    MalformedVersion {
        identifier: SecretIdentifier,
        region: String,
        detail: String,
    },

    /// Regions disagree about the value or version of an identifier
    #[error("regional inconsistency for {identifier} in: {} ({detail})", .regions.join(", "))]
    RegionalInconsistency {
        identifier: SecretIdentifier,
        regions: Vec<String>,
        detail: String,
    },

    /// Regions were left holding different data and automatic repair is not possible
    #[error(
        "{operation} of {identifier} left regions inconsistent, manual intervention required: {}",
        .regions.join(", ")
    )]
    PartialFailure {
        identifier: SecretIdentifier,
        operation: Operation,
        regions: Vec<String>,
    },

    #[error("backend error in {region}: {source}")]
    Backend {
        region: String,
        #[source]
        source: BackendError,
    },
}

impl StoreError {
    /// Region names carried by the error, if any
    #[must_use]
    pub fn regions(&self) -> Vec<&str> {
        match self {
            StoreError::IdentifierAlreadyExists { regions, .. }
            | StoreError::RegionalInconsistency { regions, .. }
            | StoreError::PartialFailure { regions, .. } => {
                regions.iter().map(String::as_str).collect()
            }
            StoreError::MalformedVersion { region, .. } | StoreError::Backend { region, .. } => {
                vec![region.as_str()]
            }
            _ => Vec::new(),
        }
    }

    /// True when a human has to repair regional state before the identifier is usable again
    #[must_use]
    pub fn requires_intervention(&self) -> bool {
        matches!(
            self,
            StoreError::PartialFailure { .. } | StoreError::RegionalInconsistency { .. }
        )
    }
}
