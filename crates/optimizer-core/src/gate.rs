//! Readiness gates for loading a configuration and starting a run.
//!
//! Both gates are pure functions of the current state. Nothing here is
//! cached: callers recompute on every change, so a gate can never be stale.
//! The `check_*` variants return every unmet condition so a rejected
//! action can tell the operator exactly what to fix.

use optimizer_types::{RunConfiguration, VariableSet, VariableSetKind};

/// A single unmet precondition of a gated operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateViolation {
    /// No simulator has been selected.
    #[error("select a simulator")]
    MissingSimulator,

    /// No circuit file has been provided.
    #[error("upload a circuit file")]
    MissingCircuitFile,

    /// No configuration has been loaded yet.
    #[error("load a configuration first")]
    NotConfigured,

    /// A run is already in progress.
    #[error("wait for the active run to finish")]
    RunInProgress,

    /// One or more variables have missing or reversed bounds.
    #[error("fix invalid min/max ranges in {set} variables: {}", .names.join(", "))]
    InvalidRanges {
        /// The set containing the invalid variables.
        set: VariableSetKind,
        /// Names of the invalid variables, in set order.
        names: Vec<String>,
    },
}

/// Inputs of the run gate.
#[derive(Debug, Clone, Copy)]
pub struct RunGateInputs<'a> {
    /// Whether a configuration has been loaded.
    pub configured: bool,
    /// Whether a run is currently in progress.
    pub run_in_progress: bool,
    /// Current design variables.
    pub design: &'a VariableSet,
    /// Current test variables.
    pub test: &'a VariableSet,
}

/// Whether a configuration can be loaded: a circuit file is present and a
/// simulator is selected. The preconfiguration file plays no part.
pub const fn can_load(configuration: &RunConfiguration) -> bool {
    configuration.circuit_file.is_some() && configuration.simulator.is_some()
}

/// Every unmet load precondition, simulator first.
pub fn check_load(configuration: &RunConfiguration) -> Vec<GateViolation> {
    let mut violations = Vec::new();
    if configuration.simulator.is_none() {
        violations.push(GateViolation::MissingSimulator);
    }
    if configuration.circuit_file.is_none() {
        violations.push(GateViolation::MissingCircuitFile);
    }
    violations
}

/// Whether a run can be started.
pub fn can_run(inputs: &RunGateInputs<'_>) -> bool {
    inputs.configured
        && !inputs.run_in_progress
        && VariableSet::jointly_valid(inputs.design, inputs.test)
}

/// Every unmet run precondition.
///
/// Range problems are only reported once a configuration is loaded; before
/// that the sets are empty and the only useful advice is to load one.
pub fn check_run(inputs: &RunGateInputs<'_>) -> Vec<GateViolation> {
    let mut violations = Vec::new();
    if !inputs.configured {
        violations.push(GateViolation::NotConfigured);
        return violations;
    }
    if inputs.run_in_progress {
        violations.push(GateViolation::RunInProgress);
    }
    for (set, variables) in [
        (VariableSetKind::Design, inputs.design),
        (VariableSetKind::Test, inputs.test),
    ] {
        let names = variables.invalid_names();
        if !names.is_empty() {
            violations.push(GateViolation::InvalidRanges { set, names });
        }
    }
    violations
}
