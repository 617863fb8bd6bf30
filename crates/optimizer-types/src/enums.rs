//! Enumeration types for the optimizer control surface.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Simulator selection
// ---------------------------------------------------------------------------

/// The simulator a configuration is prepared for.
///
/// The wire names match the labels the operator picks from, including the
/// upper-case `PLECS` and the literal `None` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Simulator {
    /// Cadence Spectre/OCEAN flow.
    Cadence,
    /// PTC Mathcad worksheet.
    Mathcad,
    /// Excel workbook model.
    Excel,
    /// PLECS power-electronics model.
    #[serde(rename = "PLECS")]
    Plecs,
    /// No simulator backend; the run is purely synthetic.
    #[serde(rename = "None")]
    NoBackend,
}

impl Simulator {
    /// Every selectable simulator, in menu order.
    pub const ALL: [Self; 5] = [
        Self::Cadence,
        Self::Mathcad,
        Self::Excel,
        Self::Plecs,
        Self::NoBackend,
    ];

    /// The operator-facing label for this simulator.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cadence => "Cadence",
            Self::Mathcad => "Mathcad",
            Self::Excel => "Excel",
            Self::Plecs => "PLECS",
            Self::NoBackend => "None",
        }
    }
}

impl core::fmt::Display for Simulator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Run lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of a simulation run.
///
/// `Idle` is initial. `Completed`, `Cancelled` and `Failed` are terminal:
/// only a fresh start leaves them.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum RunStatus {
    /// No run has started since the last configuration load.
    #[default]
    Idle,
    /// A run is ticking.
    Running,
    /// The run reached 100% progress.
    Completed,
    /// The run was cancelled before completion.
    Cancelled,
    /// The backend reported a failure or the run timed out.
    Failed,
}

impl RunStatus {
    /// Whether a run is currently in progress.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether the status is terminal (no further ticks will occur).
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

// ---------------------------------------------------------------------------
// Variable editing
// ---------------------------------------------------------------------------

/// Which bound of a variable an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum BoundField {
    /// The lower bound.
    Min,
    /// The upper bound.
    Max,
}

/// Which of the two concurrent variable sets an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum VariableSetKind {
    /// Circuit parameters the optimizer may adjust.
    Design,
    /// Environmental or corner parameters swept during verification.
    Test,
}

impl core::fmt::Display for VariableSetKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Design => f.write_str("design"),
            Self::Test => f.write_str("test"),
        }
    }
}

/// Severity of an operator notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum NoticeLevel {
    /// Informational confirmation.
    Info,
    /// A rejected action the operator must correct.
    Error,
}
