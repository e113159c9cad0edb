use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use shlok_core::config::ServiceConfig;
use shlok_core::practice::SessionRegistry;
use shlok_core::server::{self, AppState};
use shlok_core::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load()?;
    let _log_guard = init_tracing(&config.log)?;

    let catalog = config.build_catalog()?;
    info!(target: "catalog", songs = catalog.len(), "song catalog ready");

    let audio = config.build_audio_source();
    let registry = SessionRegistry::new(config.practice.clone(), Arc::clone(&audio));
    let state = AppState::new(registry, Arc::new(catalog), audio);

    server::serve(config.bind, state).await
}
