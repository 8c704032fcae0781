//! # Constants
//!
//! Shared constants used throughout the store.
//!
//! These values represent reasonable defaults and can be overridden via
//! [`StoreConfig`](crate::config::StoreConfig) or environment variables where applicable.

/// Regions written to when nothing else is configured, in write order
pub const DEFAULT_REGIONS: [&str; 4] = ["us-west-1", "us-west-2", "us-east-1", "us-east-2"];

/// Primary read region used when neither `SECRET_STORE_PRIMARY_REGION` nor `AWS_REGION` is set
pub const DEFAULT_PRIMARY_REGION: &str = "us-west-1";

/// Upper bound for a single regional call (milliseconds)
pub const DEFAULT_REGION_CALL_TIMEOUT_MS: u64 = 10_000;

/// Default deadline for a whole store operation (milliseconds)
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;

/// Delay before the single retry of failed regions (milliseconds)
pub const DEFAULT_RETRY_DELAY_MS: u64 = 0;

/// Page size for list-by-prefix calls
/// Parameter Store rejects `MaxResults` above 50
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 50;

/// Number of full enumerations performed by a listing
pub const DEFAULT_LIST_ATTEMPTS: u32 = 2;

/// Pause after every listing page to stay under backend rate limits (milliseconds)
pub const DEFAULT_LIST_PAGE_DELAY_MS: u64 = 100;

/// Pause between two full enumerations (milliseconds)
pub const DEFAULT_LIST_ATTEMPT_DELAY_MS: u64 = 1_000;

/// Parameters with this suffix are private to the deploy tooling and never listed
pub const CURRENT_DEPLOY_SUFFIX: &str = "current-deploy";

/// Pause between successive reads in the dupes/groups utilities (milliseconds)
pub const DEFAULT_UTIL_READ_DELAY_MS: u64 = 100;
