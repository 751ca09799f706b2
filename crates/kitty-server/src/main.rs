//! Kitty game server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `KITTY_CONFIG` or `kitty-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the shared state (state machine, action registry, broadcast)
//! 4. Serve until `Ctrl-C`
//! 5. Cancel any pending autonomous transition

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use kitty_core::KittyConfig;
use kitty_core::config::DEFAULT_CONFIG_PATH;
use kitty_server::{AppState, ServerConfig, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let path = std::env::var_os("KITTY_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = KittyConfig::load_or_default(&path)
        .with_context(|| format!("loading {}", path.display()))?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    init_tracing(&config);

    info!("kitty-server starting");
    if from_file {
        info!(path = %path.display(), "Configuration loaded");
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
    }

    // 3. Build shared state.
    let state = Arc::new(AppState::new(&config).context("creating state machine")?);
    info!(
        state = %state.machine.state(),
        game_path = %state.game_path,
        ping_interval_secs = config.liveness.ping_interval_secs,
        "Kitty is awake"
    );

    // 4. Serve.
    let server_config = ServerConfig::from(&config);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };
    start_server(&server_config, Arc::clone(&state), shutdown)
        .await
        .context("running server")?;

    // 5. Stop the pending timer.
    state.machine.dispose();
    info!("kitty-server stopped");
    Ok(())
}

fn init_tracing(config: &KittyConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
