//! Shared fixtures for store integration tests

#![allow(dead_code, reason = "Not every test binary uses every fixture")]

use regional_secrets::config::{ListConfig, StoreConfig};
use regional_secrets::model::{Environment, SecretIdentifier};
use regional_secrets::provider::memory::InMemoryRegion;
use regional_secrets::store::MultiRegionStore;

pub const PRIMARY: &str = "us-west-1";
pub const SECONDARY: &str = "us-east-1";
pub const TERTIARY: &str = "us-east-2";

/// Config for `regions` with listing pacing disabled
pub fn test_config(regions: &[&str]) -> StoreConfig {
    StoreConfig {
        list: ListConfig::default().unpaced(),
        ..StoreConfig::for_regions(regions.iter().copied())
    }
}

/// Store over in-memory regions plus handles sharing their state
pub fn store_with(config: StoreConfig) -> (MultiRegionStore<InMemoryRegion>, Vec<InMemoryRegion>) {
    let regions: Vec<InMemoryRegion> = config.regions.iter().map(InMemoryRegion::new).collect();
    let store = MultiRegionStore::new(config, regions.clone()).expect("valid test store");
    (store, regions)
}

/// Two-region store, primary first
pub fn two_region_store() -> (MultiRegionStore<InMemoryRegion>, Vec<InMemoryRegion>) {
    store_with(test_config(&[PRIMARY, SECONDARY]))
}

pub fn ci_id(service: &str, key: &str) -> SecretIdentifier {
    SecretIdentifier::new(Environment::CITest, service, key).expect("valid test identifier")
}
