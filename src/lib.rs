//! # Regional Secrets
//!
//! A versioned secret store replicated across independent regional backends.
//!
//! Secrets are addressed by [`SecretIdentifier`] (environment, service, key)
//! and carry a dense zero-based version history. [`MultiRegionStore`] writes
//! every secret to all configured regions, retries failed regions once, rolls
//! back on failure, and refuses to return a value that the regions disagree on.
//!
//! ## Modules
//!
//! - [`model`]: identifiers, secrets, and version metadata
//! - [`provider`]: the [`RegionalBackend`] trait with in-memory and Parameter Store adapters
//! - [`store`]: the [`SecretStore`] trait and the multi-region protocol
//! - [`listing`]: paced, repeated enumeration of a region's names
//! - [`util`]: duplicate and group scans over any store
//! - [`config`]: region layout and timings
//! - [`observability`]: metrics and logging setup
//! - [`cli`]: the `regctl` command set

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod listing;
pub mod model;
pub mod observability;
pub mod provider;
pub mod store;
pub mod util;

pub use config::{ConfigError, ListConfig, StoreConfig};
pub use error::{BackendError, Operation, StoreError};
pub use model::{Environment, Secret, SecretIdentifier, SecretMeta};
pub use provider::RegionalBackend;
pub use store::{DeadlineStore, MultiRegionStore, SecretStore};
