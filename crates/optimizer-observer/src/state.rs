//! Shared application state for the operator API server.

use std::sync::Arc;

use optimizer_core::session::SessionController;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. Every
/// handler goes through the one [`SessionController`], which serialises
/// all mutations.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The operator session.
    pub controller: Arc<SessionController>,
}

impl AppState {
    /// Create application state around an existing controller.
    pub const fn new(controller: Arc<SessionController>) -> Self {
        Self { controller }
    }
}
