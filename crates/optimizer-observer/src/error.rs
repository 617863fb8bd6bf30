//! Error types for the operator API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use optimizer_core::gate::GateViolation;
use optimizer_core::loader::LoadError;
use optimizer_core::runner::RunError;
use optimizer_types::VariableSetError;

/// Errors that can occur in the operator API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// A gated action was attempted while its gate was closed.
    #[error("{message}")]
    Gate {
        /// Summary of the rejection.
        message: String,
        /// One entry per unmet precondition.
        reasons: Vec<String>,
    },

    /// A run is already in progress.
    #[error("a simulation run is already in progress")]
    AlreadyRunning,

    /// The server is shutting down.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body or path could not be understood.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The simulator backend refused the request.
    #[error("backend error: {0}")]
    Backend(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ObserverError {
    fn gate(message: String, violations: &[GateViolation]) -> Self {
        Self::Gate {
            message,
            reasons: violations.iter().map(ToString::to_string).collect(),
        }
    }
}

impl From<LoadError> for ObserverError {
    fn from(e: LoadError) -> Self {
        match &e {
            LoadError::GateNotSatisfied { violations } => Self::gate(e.to_string(), violations),
            LoadError::Variables { .. } | LoadError::Extraction { .. } => {
                Self::Internal(e.to_string())
            }
        }
    }
}

impl From<RunError> for ObserverError {
    fn from(e: RunError) -> Self {
        match &e {
            RunError::GateNotSatisfied { violations } => Self::gate(e.to_string(), violations),
            RunError::AlreadyRunning => Self::AlreadyRunning,
            RunError::ShuttingDown => Self::Unavailable(e.to_string()),
            RunError::Backend { .. } => Self::Backend(e.to_string()),
        }
    }
}

impl From<VariableSetError> for ObserverError {
    fn from(e: VariableSetError) -> Self {
        match e {
            VariableSetError::IndexOutOfRange { .. } => Self::NotFound(e.to_string()),
            VariableSetError::DuplicateName { .. } => Self::InvalidRequest(e.to_string()),
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Gate { .. } | Self::AlreadyRunning => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match self {
            Self::Gate { message, reasons } => serde_json::json!({
                "error": message,
                "status": status.as_u16(),
                "reasons": reasons,
            }),
            other => serde_json::json!({
                "error": other.to_string(),
                "status": status.as_u16(),
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}
