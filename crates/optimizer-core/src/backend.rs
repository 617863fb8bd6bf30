//! Simulator backend trait and synthetic implementation.
//!
//! A run is submitted to a [`SimulatorBackend`], which hands back a
//! [`ProgressSource`]. The run driver polls that source once per tick and
//! applies each [`ProgressEvent`] to the run state machine. The source is
//! the only thing that knows how far a run has got; the driver never
//! invents progress.
//!
//! The [`SyntheticBackend`] stands in for a real simulator: each tick it
//! advances by a uniform random increment and reports a made-up corner.

use optimizer_types::{RunId, Simulator, VariableSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SyntheticConfig;

/// Errors that can occur while talking to a simulator backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend refused the run request.
    #[error("run {run_id} rejected: {message}")]
    Rejected {
        /// The rejected run.
        run_id: RunId,
        /// Why the backend refused.
        message: String,
    },

    /// The backend configuration is unusable.
    #[error("invalid backend configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// An internal error in the backend.
    #[error("backend error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

/// Everything a backend needs to start a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Identifier assigned to the run.
    pub run_id: RunId,
    /// Selected simulator. Unset after a bypass load.
    pub simulator: Option<Simulator>,
    /// Design variables at submission time.
    pub design_variables: VariableSet,
    /// Test variables at submission time.
    pub test_variables: VariableSet,
}

/// One observation reported by a running simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Work advanced.
    Advance {
        /// Percentage points gained since the previous tick.
        progress_delta: f64,
        /// Status line describing the work done.
        log_line: String,
    },
    /// The simulation finished, regardless of accumulated progress.
    Complete,
    /// The simulation failed.
    Failed {
        /// Why it failed.
        reason: String,
    },
}

/// A per-run stream of progress observations.
pub trait ProgressSource: Send {
    /// Produce the observation for the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend can no longer report on the
    /// run. The driver treats this as a failed run.
    fn next_tick(&mut self) -> Result<ProgressEvent, BackendError>;
}

/// A simulator that accepts runs.
pub trait SimulatorBackend: Send + Sync {
    /// Start a run and return its progress stream.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the run cannot be started.
    fn submit_run(&self, request: &RunRequest) -> Result<Box<dyn ProgressSource>, BackendError>;
}

/// A backend that fabricates progress.
///
/// With a seed, every run replays the same sequence of increments and
/// corners; without one, each run draws a fresh OS-seeded generator.
#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    seed: Option<u64>,
    max_increment: f64,
    corner_count: u32,
}

impl SyntheticBackend {
    /// Create a synthetic backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidConfig`] if `max_increment` is not a
    /// positive finite number or `corner_count` is zero.
    pub fn new(config: &SyntheticConfig) -> Result<Self, BackendError> {
        if !config.max_increment.is_finite() || config.max_increment <= 0.0 {
            return Err(BackendError::InvalidConfig {
                message: format!(
                    "max_increment must be positive and finite, got {}",
                    config.max_increment
                ),
            });
        }
        if config.corner_count == 0 {
            return Err(BackendError::InvalidConfig {
                message: "corner_count must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            seed: config.seed,
            max_increment: config.max_increment,
            corner_count: config.corner_count,
        })
    }
}

impl SimulatorBackend for SyntheticBackend {
    fn submit_run(&self, request: &RunRequest) -> Result<Box<dyn ProgressSource>, BackendError> {
        let rng = self
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        tracing::debug!(
            run_id = %request.run_id,
            simulator = ?request.simulator,
            seeded = self.seed.is_some(),
            "Synthetic run submitted"
        );
        Ok(Box::new(SyntheticProgress {
            rng,
            max_increment: self.max_increment,
            corner_count: self.corner_count,
        }))
    }
}

/// Progress stream of one synthetic run.
#[derive(Debug)]
struct SyntheticProgress {
    rng: StdRng,
    max_increment: f64,
    corner_count: u32,
}

impl ProgressSource for SyntheticProgress {
    fn next_tick(&mut self) -> Result<ProgressEvent, BackendError> {
        let progress_delta = self.rng.random_range(0.0..self.max_increment);
        let corner = self.rng.random_range(0..self.corner_count);
        Ok(ProgressEvent::Advance {
            progress_delta,
            log_line: format!("Analysis running... corner {corner} complete."),
        })
    }
}
