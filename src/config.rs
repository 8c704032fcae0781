//! # Store Configuration
//!
//! Region layout and protocol timings, loaded from environment variables or
//! built in code. A [`StoreConfig`] is handed to the store at construction and
//! never changes afterwards.

use crate::constants::{
    DEFAULT_LIST_ATTEMPTS, DEFAULT_LIST_ATTEMPT_DELAY_MS, DEFAULT_LIST_PAGE_DELAY_MS,
    DEFAULT_LIST_PAGE_SIZE, DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_PRIMARY_REGION,
    DEFAULT_REGIONS, DEFAULT_REGION_CALL_TIMEOUT_MS, DEFAULT_RETRY_DELAY_MS,
};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Invalid region layout or protocol settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one region must be configured")]
    NoRegions,

    #[error("region configured more than once: {0}")]
    DuplicateRegion(String),

    #[error("primary region {0} is not one of the configured regions")]
    PrimaryNotConfigured(String),

    #[error("no backend supplied for configured region {0}")]
    MissingBackend(String),

    #[error("backend supplied for unconfigured region {0}")]
    UnexpectedBackend(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

/// Listing pagination and retry settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConfig {
    /// Maximum names requested per page
    pub page_size: u32,
    /// Number of full enumerations; the largest result wins
    pub attempts: u32,
    /// Pause after every page
    pub page_delay: Duration,
    /// Pause between enumerations
    pub attempt_delay: Duration,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_LIST_PAGE_SIZE,
            attempts: DEFAULT_LIST_ATTEMPTS,
            page_delay: Duration::from_millis(DEFAULT_LIST_PAGE_DELAY_MS),
            attempt_delay: Duration::from_millis(DEFAULT_LIST_ATTEMPT_DELAY_MS),
        }
    }
}

impl ListConfig {
    /// No pacing between pages or attempts
    #[must_use]
    pub fn unpaced(mut self) -> Self {
        self.page_delay = Duration::ZERO;
        self.attempt_delay = Duration::ZERO;
        self
    }
}

/// Store-level configuration
///
/// All settings have defaults and can be overridden via environment variables
/// (see [`StoreConfig::from_env`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Regions in write order; order only affects which failure is reported first
    pub regions: Vec<String>,
    /// Region used for single-region reads (value returned by Read, History, List)
    pub primary_region: String,
    /// Upper bound for any single regional call
    pub region_call_timeout: Duration,
    /// Deadline applied to a store operation when the caller gives none
    pub operation_timeout: Duration,
    /// Pause before retrying the failed subset of regions
    pub retry_delay: Duration,
    /// Check every region (instead of only the primary) before Create
    pub strict_create_check: bool,
    pub list: ListConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS.iter().map(ToString::to_string).collect(),
            primary_region: DEFAULT_PRIMARY_REGION.to_string(),
            region_call_timeout: Duration::from_millis(DEFAULT_REGION_CALL_TIMEOUT_MS),
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            strict_create_check: true,
            list: ListConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Configuration for the given regions, primary being the first one
    #[must_use]
    pub fn for_regions<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let regions: Vec<String> = regions.into_iter().map(Into::into).collect();
        let primary_region = regions.first().cloned().unwrap_or_default();
        Self {
            regions,
            primary_region,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_primary(mut self, region: impl Into<String>) -> Self {
        self.primary_region = region.into();
        self
    }

    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let regions = std::env::var("SECRET_STORE_REGIONS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REGIONS.iter().map(ToString::to_string).collect());

        let primary_region = std::env::var("SECRET_STORE_PRIMARY_REGION")
            .or_else(|_| std::env::var("AWS_REGION"))
            .unwrap_or_else(|_| DEFAULT_PRIMARY_REGION.to_string());

        Self {
            regions,
            primary_region,
            region_call_timeout: Duration::from_millis(env_var_or_default(
                "SECRET_STORE_REGION_CALL_TIMEOUT_MS",
                DEFAULT_REGION_CALL_TIMEOUT_MS,
            )),
            operation_timeout: Duration::from_millis(env_var_or_default(
                "SECRET_STORE_OPERATION_TIMEOUT_MS",
                DEFAULT_OPERATION_TIMEOUT_MS,
            )),
            retry_delay: Duration::from_millis(env_var_or_default(
                "SECRET_STORE_RETRY_DELAY_MS",
                DEFAULT_RETRY_DELAY_MS,
            )),
            strict_create_check: env_var_or_default_bool("SECRET_STORE_STRICT_CREATE_CHECK", true),
            list: ListConfig {
                page_size: env_var_or_default("SECRET_STORE_LIST_PAGE_SIZE", DEFAULT_LIST_PAGE_SIZE),
                attempts: env_var_or_default("SECRET_STORE_LIST_ATTEMPTS", DEFAULT_LIST_ATTEMPTS),
                page_delay: Duration::from_millis(env_var_or_default(
                    "SECRET_STORE_LIST_PAGE_DELAY_MS",
                    DEFAULT_LIST_PAGE_DELAY_MS,
                )),
                attempt_delay: Duration::from_millis(env_var_or_default(
                    "SECRET_STORE_LIST_ATTEMPT_DELAY_MS",
                    DEFAULT_LIST_ATTEMPT_DELAY_MS,
                )),
            },
        }
    }

    /// Check region layout and protocol settings
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.regions.is_empty() {
            return Err(ConfigError::NoRegions);
        }
        let mut seen = HashSet::new();
        for region in &self.regions {
            if !seen.insert(region.as_str()) {
                return Err(ConfigError::DuplicateRegion(region.clone()));
            }
        }
        if !seen.contains(self.primary_region.as_str()) {
            return Err(ConfigError::PrimaryNotConfigured(self.primary_region.clone()));
        }
        if self.list.page_size == 0 {
            return Err(ConfigError::ZeroValue("list page size"));
        }
        if self.list.attempts == 0 {
            return Err(ConfigError::ZeroValue("list attempts"));
        }
        if self.region_call_timeout.is_zero() {
            return Err(ConfigError::ZeroValue("region call timeout"));
        }
        if self.operation_timeout.is_zero() {
            return Err(ConfigError::ZeroValue("operation timeout"));
        }
        Ok(())
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StoreConfig::default();
        assert_eq!(config.regions.len(), 4);
        assert_eq!(config.primary_region, "us-west-1");
        assert_eq!(config.list.attempts, 2);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_for_regions_uses_first_as_primary() {
        let config = StoreConfig::for_regions(["eu-west-1", "eu-central-1"]);
        assert_eq!(config.primary_region, "eu-west-1");
        assert_eq!(config.with_primary("eu-central-1").validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_layouts() {
        assert_eq!(
            StoreConfig::for_regions(Vec::<String>::new()).validate(),
            Err(ConfigError::NoRegions)
        );
        assert_eq!(
            StoreConfig::for_regions(["a", "b", "a"]).validate(),
            Err(ConfigError::DuplicateRegion("a".to_string()))
        );
        assert_eq!(
            StoreConfig::for_regions(["a", "b"]).with_primary("c").validate(),
            Err(ConfigError::PrimaryNotConfigured("c".to_string()))
        );
        let mut config = StoreConfig::for_regions(["a"]);
        config.list.attempts = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroValue("list attempts")));
    }

    #[test]
    fn test_unpaced_list_config() {
        let list = ListConfig::default().unpaced();
        assert_eq!(list.page_delay, Duration::ZERO);
        assert_eq!(list.attempt_delay, Duration::ZERO);
        assert_eq!(list.page_size, 50);
    }
}
