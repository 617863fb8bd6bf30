//! Observer startup helper for embedding in the server binary.
//!
//! [`spawn_observer`] binds eagerly, so an address already in use is
//! reported to the caller, then serves on a background Tokio task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use optimizer_observer::startup::spawn_observer;
//!
//! let handle = spawn_observer(&config, state, shutdown).await?;
//! // The server is now running. Await the handle on shutdown.
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the operator server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind the operator server and serve it on a background task.
///
/// The task runs until `shutdown` resolves, then drains in-flight
/// requests and exits.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is invalid or cannot
/// be bound. Nothing is spawned in that case.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<()>, StartupError> {
    let listener = server::bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state, shutdown).await {
            tracing::error!(error = %e, "Operator server exited with error");
        }
    });

    tracing::info!(host = %config.host, port = config.port, "Operator server spawned on background task");

    Ok(handle)
}
