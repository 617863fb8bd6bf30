//! Error types for the server binary.
//!
//! [`LaunchError`] is the top-level error type that wraps all possible
//! failure modes during startup.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: optimizer_core::config::ConfigError,
    },

    /// The session controller could not be assembled.
    #[error("session setup error: {source}")]
    Setup {
        /// The underlying setup error.
        #[from]
        source: optimizer_core::session::SetupError,
    },

    /// Operator API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: optimizer_observer::startup::StartupError,
    },
}
