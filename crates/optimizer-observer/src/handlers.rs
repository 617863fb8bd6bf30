//! REST API endpoint handlers for the operator session.
//!
//! Every handler delegates to the shared
//! [`SessionController`](optimizer_core::session::SessionController) and
//! answers with the resulting [`SessionSnapshot`], so the client never has
//! to recompute gates itself.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/session` | Current session snapshot |
//! | `PUT` | `/api/session/circuit-file` | Select or clear the circuit file |
//! | `PUT` | `/api/session/preconfig-file` | Select or clear the preconfiguration file |
//! | `PUT` | `/api/session/simulator` | Select or clear the simulator |
//! | `POST` | `/api/configuration/load` | Gated configuration load |
//! | `POST` | `/api/configuration/bypass` | Synthetic load, no gate |
//! | `PUT` | `/api/variables/{set}/{index}` | Replace one bound |
//! | `POST` | `/api/run` | Start a run |
//! | `POST` | `/api/run/cancel` | Cancel the active run |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use optimizer_types::{
    BoundField, FileHandle, RunId, SessionSnapshot, Simulator, VariableSetKind,
};
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for the file selection endpoints.
#[derive(Debug, serde::Deserialize)]
pub struct FileSelection {
    /// Display name of the picked file, or `null` to clear it.
    pub name: Option<String>,
}

/// Request body for `PUT /api/session/simulator`.
#[derive(Debug, serde::Deserialize)]
pub struct SimulatorSelection {
    /// The chosen simulator, or `null` to clear it.
    pub simulator: Option<Simulator>,
}

/// Request body for `PUT /api/variables/{set}/{index}`.
#[derive(Debug, serde::Deserialize)]
pub struct BoundUpdate {
    /// Which bound to replace.
    pub field: BoundField,
    /// New value, or `null` to clear the bound.
    pub value: Option<f64>,
}

/// Response body for `POST /api/run`.
#[derive(Debug, serde::Serialize)]
pub struct RunStarted {
    /// Identifier of the new run.
    pub run_id: RunId,
}

/// Response body for `POST /api/run/cancel`.
#[derive(Debug, serde::Serialize)]
pub struct CancelResult {
    /// Whether a run was cancelled.
    pub cancelled: bool,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ObserverError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ObserverError::InvalidRequest(e.body_text()))
}

fn file_handle(selection: FileSelection) -> Result<Option<FileHandle>, ObserverError> {
    match selection.name {
        Some(name) if name.trim().is_empty() => Err(ObserverError::InvalidRequest(
            "file name must not be empty".to_owned(),
        )),
        name => Ok(name.map(FileHandle::new)),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Return the current session snapshot.
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.controller.snapshot())
}

/// Select or clear the circuit file.
pub async fn put_circuit_file(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FileSelection>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, ObserverError> {
    let file = file_handle(json_body(payload)?)?;
    Ok(Json(state.controller.select_circuit_file(file).await))
}

/// Select or clear the preconfiguration file.
pub async fn put_preconfig_file(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FileSelection>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, ObserverError> {
    let file = file_handle(json_body(payload)?)?;
    Ok(Json(state.controller.select_preconfig_file(file).await))
}

/// Select or clear the simulator.
pub async fn put_simulator(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SimulatorSelection>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, ObserverError> {
    let selection = json_body(payload)?;
    Ok(Json(
        state.controller.select_simulator(selection.simulator).await,
    ))
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Load variables for the current selection.
///
/// Responds `409` with the missing inputs when the load gate is closed.
pub async fn post_load(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionSnapshot>, ObserverError> {
    let snapshot = state.controller.load_configuration().await?;
    Ok(Json(snapshot))
}

/// Load the fixed development data set without checking the load gate.
pub async fn post_bypass(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.controller.load_synthetic().await)
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// Replace one bound of one variable.
///
/// An unknown set name is a `400`; an index past the end is a `404`.
pub async fn put_variable(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(VariableSetKind, usize)>, PathRejection>,
    payload: Result<Json<BoundUpdate>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, ObserverError> {
    let Path((set, index)) = path.map_err(|e| ObserverError::InvalidRequest(e.body_text()))?;
    let update = json_body(payload)?;
    let snapshot = state
        .controller
        .set_bound(set, index, update.field, update.value)
        .await?;
    Ok(Json(snapshot))
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Start a run. Responds `202` with the run id; progress is streamed over
/// `/ws/session` and visible in `/api/session`.
pub async fn post_run(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let handle = state.controller.start_run().await?;
    info!(run_id = %handle.run_id(), "Run started via API");
    Ok((
        StatusCode::ACCEPTED,
        Json(RunStarted {
            run_id: handle.run_id(),
        }),
    ))
}

/// Cancel the active run. Not an error when nothing is running.
pub async fn post_cancel(State(state): State<Arc<AppState>>) -> Json<CancelResult> {
    let cancelled = state.controller.cancel_run().await;
    Json(CancelResult { cancelled })
}
