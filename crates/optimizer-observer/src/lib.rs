//! Operator API server for the circuit optimizer session.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for selecting inputs, loading a configuration,
//!   editing variable bounds, and starting or cancelling runs
//! - **`WebSocket` endpoint** (`/ws/session`) streaming notices, run log
//!   lines, progress, and status changes
//!
//! # Architecture
//!
//! All endpoints go through one shared
//! [`SessionController`](optimizer_core::session::SessionController).
//! The controller owns the session and serialises every mutation; the
//! handlers only translate HTTP to controller calls and controller errors
//! to status codes. Gate failures surface as `409 Conflict` with one
//! reason per unmet precondition.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
