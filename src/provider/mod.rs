//! # Regional Backend Adapters
//!
//! Abstract interface for one region of the underlying key/value secret service.
//!
//! The multi-region store is generic over [`RegionalBackend`], so the same
//! protocol runs against AWS Parameter Store in production and against
//! [`memory::InMemoryRegion`] in tests.
//!
//! Adapters are stateless apart from their region identity and connection
//! settings. They never retry: retry and rollback policy belongs to the store.

use crate::error::BackendError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Value of a name at one version, as seen by one region
#[derive(Clone, PartialEq, Eq)]
pub struct RegionalValue {
    pub value: String,
    /// Backend-native version number
    pub version: u64,
    pub created: DateTime<Utc>,
}

impl std::fmt::Debug for RegionalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionalValue")
            .field("version", &self.version)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

/// One entry of a name's version history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRecord {
    /// Backend-native version number
    pub version: u64,
    pub created: DateTime<Utc>,
}

/// One page of a list-by-prefix enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub names: Vec<String>,
    /// Token for the following page; `None` once the listing is exhausted
    pub next_token: Option<String>,
}

/// Provider trait for one region of the secret backend
#[async_trait]
pub trait RegionalBackend: Send + Sync {
    /// Region this adapter talks to
    fn region(&self) -> &str;

    /// Native number of the first version of a name
    ///
    /// The store translates its zero-based versions with this offset.
    fn version_base(&self) -> u64 {
        1
    }

    /// Write `value` under `name`, returning the native version assigned
    ///
    /// With `overwrite == false` an existing name fails with
    /// [`BackendError::AlreadyExists`].
    async fn put(&self, name: &str, value: &str, overwrite: bool) -> Result<u64, BackendError>;

    /// Read the latest version of `name`, or a specific native version
    async fn get(&self, name: &str, version: Option<u64>) -> Result<RegionalValue, BackendError>;

    /// Delete every version of `name`
    async fn delete(&self, name: &str) -> Result<(), BackendError>;

    /// One page of names starting with `prefix`
    async fn list_by_prefix(
        &self,
        prefix: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ListPage, BackendError>;

    /// Full version history of `name`, oldest first
    async fn history(&self, name: &str) -> Result<Vec<VersionRecord>, BackendError>;
}

// Provider implementations
pub mod aws;
pub mod memory;
