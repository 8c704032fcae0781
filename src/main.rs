//! # regctl
//!
//! Command-line front end for the multi-region secret store, backed by AWS
//! Systems Manager Parameter Store in every configured region.
//!
//! ## Configuration
//!
//! - `SECRET_STORE_REGIONS`: comma-separated regions in write order
//! - `SECRET_STORE_PRIMARY_REGION`: region used for listing and history
//! - `SECRET_STORE_*_MS`: timeouts and pacing (see `StoreConfig::from_env`)
//! - `RUST_LOG`: log filter, defaults to `regional_secrets=info`
//!
//! AWS credentials are resolved by the default provider chain.

use anyhow::{Context, Result};
use clap::Parser;
use regional_secrets::cli::{execute, Cli};
use regional_secrets::config::StoreConfig;
use regional_secrets::observability::{init_tracing, metrics};
use regional_secrets::provider::aws::ParameterStoreRegion;
use regional_secrets::store::MultiRegionStore;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("regional_secrets=info");
    let cli = Cli::parse();

    metrics::register_metrics().context("Failed to register metrics")?;

    let config = StoreConfig::from_env();
    config.validate().context("Invalid store configuration")?;
    debug!(?config, "Loaded store configuration");

    let backends = ParameterStoreRegion::connect_all(&config.regions).await;
    let store = MultiRegionStore::new(config, backends).context("Failed to build store")?;

    let mut stdout = std::io::stdout().lock();
    let result = execute(&store, cli.command, &mut stdout).await;

    if cli.metrics {
        eprint!("{}", metrics::render()?);
    }
    result
}
