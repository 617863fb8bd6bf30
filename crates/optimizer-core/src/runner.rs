//! The simulation run state machine.
//!
//! [`SimulationRunner`] owns the one retained [`SimulationRun`]. It is a
//! plain synchronous state machine: the async driver in
//! [`session`](crate::session) decides *when* things happen and feeds
//! [`ProgressEvent`]s in; the runner decides *what* they mean.
//!
//! ```text
//! Idle --start--> Running --progress >= 100 / Complete--> Completed
//!                    |----Failed / error / max_ticks-----> Failed
//!                    `----cancel--------------------------> Cancelled
//! ```
//!
//! Every terminal status accepts a fresh `start`, which resets progress
//! and log. Ticks applied outside `Running` are ignored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use optimizer_types::{LogEntry, RunId, RunStatus, SimulationRun, Simulator};
use tracing::{debug, info, warn};

use crate::backend::{BackendError, ProgressEvent};
use crate::control::StopSignal;
use crate::gate::GateViolation;
use crate::loader::join_violations;

/// Upper bound of run progress.
pub const MAX_PROGRESS: f64 = 100.0;

/// Log line appended when a run reaches 100%.
pub const COMPLETED_MESSAGE: &str = "Simulation finished successfully.";

/// Log line appended when a run is cancelled.
pub const CANCELLED_MESSAGE: &str = "Simulation cancelled.";

/// Errors that can occur when starting a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The run gate was closed.
    #[error("cannot start run: {}", join_violations(.violations))]
    GateNotSatisfied {
        /// Every unmet precondition.
        violations: Vec<GateViolation>,
    },

    /// A run is already in progress.
    #[error("a simulation run is already in progress")]
    AlreadyRunning,

    /// The session is shutting down and accepts no new runs.
    #[error("the session is shutting down")]
    ShuttingDown,

    /// The backend refused the run.
    #[error("backend refused run: {source}")]
    Backend {
        /// The underlying backend error.
        #[from]
        source: BackendError,
    },
}

/// Effect of one applied tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Progress advanced and the run is still going.
    Advanced,
    /// The run reached 100% and is now `Completed`.
    Completed,
    /// The run is now `Failed`.
    Failed,
    /// The run was not `Running`; nothing changed.
    Ignored,
}

/// Owner of the single retained run.
#[derive(Debug, Default)]
pub struct SimulationRunner {
    run: SimulationRun,
    control: Option<Arc<StopSignal>>,
    max_ticks: u64,
}

impl SimulationRunner {
    /// Create an idle runner. `max_ticks` of 0 disables the tick limit.
    pub fn new(max_ticks: u64) -> Self {
        Self {
            max_ticks,
            ..Self::default()
        }
    }

    /// The current run.
    pub const fn run(&self) -> &SimulationRun {
        &self.run
    }

    /// A clone of the current run.
    pub fn snapshot(&self) -> SimulationRun {
        self.run.clone()
    }

    /// Whether a run is in progress.
    pub const fn is_running(&self) -> bool {
        self.run.status.is_running()
    }

    /// Whether `run_id` identifies the current run.
    pub fn is_current(&self, run_id: RunId) -> bool {
        self.run.id == Some(run_id)
    }

    /// Number of ticks applied to the current run.
    pub const fn ticks(&self) -> u64 {
        self.run.ticks
    }

    /// Start a new run, discarding the previous run's progress and log.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::AlreadyRunning`] if a run is in progress.
    pub fn start(
        &mut self,
        run_id: RunId,
        simulator: Option<Simulator>,
        control: Arc<StopSignal>,
        now: DateTime<Utc>,
    ) -> Result<(), RunError> {
        if self.is_running() {
            return Err(RunError::AlreadyRunning);
        }
        let label = simulator.map_or("no simulator", Simulator::label);
        self.run = SimulationRun {
            id: Some(run_id),
            simulator,
            status: RunStatus::Running,
            progress: 0.0,
            log: vec![LogEntry::new(
                now,
                format!("Simulation started with {label}..."),
            )],
            ticks: 0,
            started_at: Some(now),
            finished_at: None,
            failure: None,
        };
        self.control = Some(control);
        info!(run_id = %run_id, simulator = label, "Simulation run started");
        Ok(())
    }

    /// Apply one progress observation.
    pub fn apply(&mut self, event: ProgressEvent, now: DateTime<Utc>) -> TickOutcome {
        if !self.is_running() {
            debug!(status = ?self.run.status, "Ignoring tick for inactive run");
            return TickOutcome::Ignored;
        }
        self.run.ticks = self.run.ticks.saturating_add(1);

        match event {
            ProgressEvent::Advance {
                progress_delta,
                log_line,
            } => {
                // Progress never regresses.
                let delta = if progress_delta.is_nan() {
                    0.0
                } else {
                    progress_delta.max(0.0)
                };
                let progress = (self.run.progress + delta).min(MAX_PROGRESS);
                if progress >= MAX_PROGRESS {
                    return self.complete(now);
                }
                self.run.progress = progress;
                self.push_log(now, log_line);
                if self.max_ticks > 0 && self.run.ticks >= self.max_ticks {
                    let reason = format!("timed out after {} ticks", self.max_ticks);
                    self.fail(reason, now);
                    return TickOutcome::Failed;
                }
                TickOutcome::Advanced
            }
            ProgressEvent::Complete => self.complete(now),
            ProgressEvent::Failed { reason } => {
                self.fail(reason, now);
                TickOutcome::Failed
            }
        }
    }

    /// Fail the current run with `reason`.
    ///
    /// Returns `false` if no run was in progress.
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> bool {
        if !self.is_running() {
            return false;
        }
        let reason = reason.into();
        warn!(run_id = ?self.run.id, reason = %reason, "Simulation run failed");
        self.push_log(now, format!("Simulation failed: {reason}"));
        self.run.failure = Some(reason);
        self.finish(RunStatus::Failed, now);
        true
    }

    /// Cancel the current run and signal its driver.
    ///
    /// Returns `false` if no run was in progress.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_running() {
            return false;
        }
        if let Some(control) = &self.control {
            control.request_stop();
        }
        self.push_log(now, CANCELLED_MESSAGE);
        self.finish(RunStatus::Cancelled, now);
        info!(run_id = ?self.run.id, progress = self.run.progress, "Simulation run cancelled");
        true
    }

    /// Return to `Idle`, cancelling any run in progress first.
    pub fn reset(&mut self) {
        if let Some(control) = self.control.take() {
            control.request_stop();
        }
        self.run = SimulationRun::default();
    }

    fn complete(&mut self, now: DateTime<Utc>) -> TickOutcome {
        self.run.progress = MAX_PROGRESS;
        self.push_log(now, COMPLETED_MESSAGE);
        self.finish(RunStatus::Completed, now);
        info!(run_id = ?self.run.id, ticks = self.run.ticks, "Simulation run completed");
        TickOutcome::Completed
    }

    fn finish(&mut self, status: RunStatus, now: DateTime<Utc>) {
        self.run.status = status;
        self.run.finished_at = Some(self.clamped(now));
        self.control = None;
    }

    fn push_log(&mut self, now: DateTime<Utc>, message: impl Into<String>) {
        let at = self.clamped(now);
        self.run.log.push(LogEntry::new(at, message));
    }

    /// `now`, raised to the latest log timestamp if the clock stepped back.
    fn clamped(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.run.log.last().map_or(now, |last| now.max(last.at))
    }
}
