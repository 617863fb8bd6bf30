//! Run configuration, run state, and the session snapshot.
//!
//! These are the records the control surface exchanges with its
//! presentation layer. The presentation layer only ever receives clones;
//! all mutation happens inside the session controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{NoticeLevel, RunStatus, Simulator};
use crate::ids::RunId;
use crate::variables::VariableSet;

// ---------------------------------------------------------------------------
// Inputs from file acquisition
// ---------------------------------------------------------------------------

/// A file the operator has picked. Only the display name is known here;
/// the control surface never reads file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FileHandle {
    /// Display name of the file (e.g. `amp.ocn`).
    pub name: String,
}

impl FileHandle {
    /// Create a handle for a named file.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The operator's current selections, consumed by the configuration loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RunConfiguration {
    /// Required circuit description file.
    pub circuit_file: Option<FileHandle>,
    /// Optional preconfiguration file.
    pub preconfig_file: Option<FileHandle>,
    /// Selected simulator, unset until the operator picks one.
    pub simulator: Option<Simulator>,
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// One timestamped line of the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LogEntry {
    /// When the line was appended.
    pub at: DateTime<Utc>,
    /// The log text.
    pub message: String,
}

impl LogEntry {
    /// Create a log entry.
    pub fn new(at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            at,
            message: message.into(),
        }
    }
}

impl core::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// State of the latest simulation run.
///
/// Only one run is retained: starting a new run replaces this record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationRun {
    /// Identifier of the run, absent while `Idle`.
    pub id: Option<RunId>,
    /// Simulator the run was started with.
    pub simulator: Option<Simulator>,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Progress percentage in `[0, 100]`, non-decreasing within a run.
    pub progress: f64,
    /// Append-only run log.
    pub log: Vec<LogEntry>,
    /// Number of progress ticks applied.
    pub ticks: u64,
    /// When the run started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the run reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Failure reason when `status` is `Failed`.
    pub failure: Option<String>,
}

// ---------------------------------------------------------------------------
// Presentation-facing state
// ---------------------------------------------------------------------------

/// Everything the presentation layer may observe, recomputed on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SessionSnapshot {
    /// Whether a configuration has been loaded.
    pub configured: bool,
    /// Currently selected circuit file.
    pub circuit_file: Option<FileHandle>,
    /// Currently selected preconfiguration file.
    pub preconfig_file: Option<FileHandle>,
    /// Currently selected simulator.
    pub simulator: Option<Simulator>,
    /// Design variables of the loaded configuration.
    pub design_variables: VariableSet,
    /// Test variables of the loaded configuration.
    pub test_variables: VariableSet,
    /// Whether the load gate is open.
    pub can_load: bool,
    /// Whether the run gate is open.
    pub can_run: bool,
    /// The latest run.
    pub run: SimulationRun,
}

/// An event streamed to subscribers as the session changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SessionEvent {
    /// A user-facing notification.
    Notice {
        /// Severity.
        level: NoticeLevel,
        /// Short title.
        title: String,
        /// Longer description.
        description: String,
    },
    /// A line appended to the run log.
    Log {
        /// The run the line belongs to.
        run_id: RunId,
        /// The appended entry.
        entry: LogEntry,
    },
    /// Progress of a run advanced.
    Progress {
        /// The run that advanced.
        run_id: RunId,
        /// New progress percentage.
        progress: f64,
    },
    /// A run changed status.
    Status {
        /// The run that changed.
        run_id: RunId,
        /// The new status.
        status: RunStatus,
    },
}

impl SessionEvent {
    /// Build an informational notice.
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Info,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Build an error notice.
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}
