//! Agreement Governance Core entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use governance_core::config::CoreConfig;
use governance_core::ports::{JsonRpcBlockchainAdapter, SledAgreementStore};
use governance_core::registry_client::HttpRegistryClient;
use governance_core::GovernanceCore;
use governance_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry_config = TelemetryConfig::from_env();
    let _telemetry_guard =
        init_telemetry(&telemetry_config).context("failed to initialize telemetry")?;

    info!("agreement governance core starting");

    let config = CoreConfig::from_env();
    let store = Arc::new(
        SledAgreementStore::open("./data/agreements")
            .context("failed to open the agreement store")?,
    );
    let blockchain = Arc::new(JsonRpcBlockchainAdapter::new(config.geth_url.clone()));
    let registry = Arc::new(HttpRegistryClient::new(config.exchange_url.clone()));

    let mut core = GovernanceCore::new(&config, store, blockchain, registry);
    let handles = core.spawn();

    info!("agreement governance core running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down gracefully");

    for handle in handles {
        handle.abort();
    }

    Ok(())
}
