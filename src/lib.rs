pub mod config;
pub mod host;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod platform;
pub mod presence;
pub mod store;
pub mod sync;
pub mod tracking;
pub mod utils;

#[cfg(test)]
mod test_support;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};

use config::EngineConfig;
use lifecycle::{LifecycleMonitor, MonitorSettings};
use notify::OnlineIndicator;
use platform::{Clock, LifecyclePort, LocationProvider};
use presence::PresenceStateHolder;
use store::{KeyValueStore, SqliteStore};
use sync::{HttpSyncForwarder, SessionTokenStore};
use tracking::LocationSampler;

/// Host-supplied collaborators.
pub struct EngineParts {
    pub provider: Arc<dyn LocationProvider>,
    pub lifecycle: Arc<dyn LifecyclePort>,
    pub indicator: OnlineIndicator,
    pub clock: Arc<dyn Clock>,
}

/// Wires store, forwarder, holder, sampler and monitor together. The
/// returned monitor has not been started.
pub async fn build_monitor(config: &EngineConfig, parts: EngineParts) -> Result<LifecycleMonitor> {
    let store: Arc<dyn KeyValueStore> = Arc::new(
        SqliteStore::open(config.store_path.clone()).context("failed to open presence store")?,
    );
    assemble(config, store, parts).await
}

pub async fn assemble(
    config: &EngineConfig,
    store: Arc<dyn KeyValueStore>,
    parts: EngineParts,
) -> Result<LifecycleMonitor> {
    let tokens = SessionTokenStore::new(Arc::clone(&store));
    if let Some(token) = config.session_token.as_deref() {
        tokens
            .set_token(Some(token))
            .await
            .context("failed to store session token")?;
    }

    let forwarder = HttpSyncForwarder::new(
        config.location_endpoint(),
        config.request_timeout(),
        Arc::new(tokens),
    )?;

    let holder = PresenceStateHolder::new(store, Arc::clone(&parts.clock), parts.indicator);
    let sampler = LocationSampler::new(
        parts.provider,
        Arc::new(forwarder),
        holder.subscribe(),
        config.sampler_settings(),
    );

    Ok(LifecycleMonitor::new(
        holder,
        sampler,
        parts.lifecycle,
        parts.clock,
        MonitorSettings {
            inactivity_timeout: config.inactivity_timeout(),
            heartbeat_interval: config.heartbeat_interval(),
        },
    ))
}

/// Entry point of the desktop binary: `genie-presence [config.json]`.
pub fn run() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EngineConfig::load(config_path)?;

    utils::init_logging(config.debug);
    log::info!("Genie presence engine starting up...");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(host::run_simulated(config))
}
