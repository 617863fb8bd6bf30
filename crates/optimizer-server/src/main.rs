//! Server binary for the circuit optimizer control surface.
//!
//! Wires the session controller to the operator API and runs until
//! `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `optimizer-config.yaml` (or the path in
//!    `OPTIMIZER_CONFIG`), falling back to defaults if absent
//! 2. Initialize structured logging (tracing)
//! 3. Build the session controller from the `runner` and `synthetic`
//!    sections
//! 4. Spawn the operator API server
//! 5. Wait for `Ctrl-C`, cancel any active run, and drain the server

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use optimizer_core::config::{LoggingConfig, OptimizerConfig};
use optimizer_core::session::SessionController;
use optimizer_observer::server::ServerConfig;
use optimizer_observer::startup::spawn_observer;
use optimizer_observer::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::LaunchError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "optimizer-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, controller setup, or server
/// startup fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so report afterwards.
    let config_path = config_path(|key| std::env::var(key).ok());
    let (config, found) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("optimizer-server starting");
    if found {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        tick_interval_ms = config.runner.tick_interval_ms,
        max_ticks = config.runner.max_ticks,
        seeded = config.synthetic.seed.is_some(),
        "Runner configuration"
    );

    // 3. Build the session controller.
    let controller = Arc::new(SessionController::from_config(&config).map_err(LaunchError::from)?);

    // 4. Start the operator API server.
    let server_config = ServerConfig::from(&config.observer);
    let state = Arc::new(AppState::new(Arc::clone(&controller)));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = spawn_observer(&server_config, state, async {
        let _ = shutdown_rx.await;
    })
    .await
    .map_err(LaunchError::from)?;

    // 5. Run until interrupted.
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
    info!("Shutdown requested");

    controller.shutdown().await;
    let _ = shutdown_tx.send(());
    if let Err(e) = server.await {
        warn!(error = %e, "Operator server task did not exit cleanly");
    }

    info!("optimizer-server stopped");
    Ok(())
}

/// Resolve the configuration path: `OPTIMIZER_CONFIG` if set, otherwise
/// [`DEFAULT_CONFIG_PATH`].
fn config_path(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("OPTIMIZER_CONFIG")
        .filter(|path| !path.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration from `path`, using defaults if the file is absent.
///
/// The returned flag reports whether the file existed.
fn load_config(path: &Path) -> Result<(OptimizerConfig, bool), LaunchError> {
    if path.exists() {
        Ok((OptimizerConfig::from_file(path)?, true))
    } else {
        Ok((OptimizerConfig::parse("")?, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
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
