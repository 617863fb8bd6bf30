//! Axum router construction for the operator API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for the browser front end.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the operator server.
///
/// The router includes:
/// - `GET /ws/session` -- `WebSocket` session event stream
/// - `GET /api/session` -- current session snapshot
/// - `PUT /api/session/{circuit-file,preconfig-file,simulator}` -- selections
/// - `POST /api/configuration/{load,bypass}` -- configuration loading
/// - `PUT /api/variables/{set}/{index}` -- bound edits
/// - `POST /api/run`, `POST /api/run/cancel` -- run control
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/ws/session", get(ws::ws_session))
        // Session selections
        .route("/api/session", get(handlers::get_session))
        .route("/api/session/circuit-file", put(handlers::put_circuit_file))
        .route(
            "/api/session/preconfig-file",
            put(handlers::put_preconfig_file),
        )
        .route("/api/session/simulator", put(handlers::put_simulator))
        // Configuration
        .route("/api/configuration/load", post(handlers::post_load))
        .route("/api/configuration/bypass", post(handlers::post_bypass))
        // Variables
        .route("/api/variables/{set}/{index}", put(handlers::put_variable))
        // Runs
        .route("/api/run", post(handlers::post_run))
        .route("/api/run/cancel", post(handlers::post_cancel))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
