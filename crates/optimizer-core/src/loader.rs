//! Configuration loading: turning operator selections into variable sets.
//!
//! The [`VariableSource`] trait abstracts how `(name, min, max)` triples
//! are obtained from a [`RunConfiguration`]. A production system would
//! plug a circuit/preconfiguration parser in here; the
//! [`SyntheticSource`] yields a fixed development data set instead.
//!
//! [`ConfigurationLoader::load`] is gated on [`gate::check_load`];
//! [`ConfigurationLoader::load_synthetic`] bypasses the gate and always
//! succeeds.

use optimizer_types::{RunConfiguration, Variable, VariableSet, VariableSetError};
use tracing::{debug, info};

use crate::config::SyntheticConfig;
use crate::gate::{self, GateViolation};

/// Errors that can occur while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The load gate was closed when `load` was called.
    #[error("cannot load configuration: {}", join_violations(.violations))]
    GateNotSatisfied {
        /// Every unmet precondition.
        violations: Vec<GateViolation>,
    },

    /// The source produced an ill-formed variable set.
    #[error("invalid variables: {source}")]
    Variables {
        /// The underlying set error.
        #[from]
        source: VariableSetError,
    },

    /// The source could not extract variables.
    #[error("variable extraction failed: {message}")]
    Extraction {
        /// Description of the failure.
        message: String,
    },
}

pub(crate) fn join_violations(violations: &[GateViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The design/test pair a load produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedVariables {
    /// Design variables.
    pub design: VariableSet,
    /// Test variables.
    pub test: VariableSet,
}

/// A producer of variable sets for a configuration.
pub trait VariableSource: Send + Sync {
    /// Extract design and test variables for `configuration`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if extraction fails or yields duplicate names.
    fn extract(&self, configuration: &RunConfiguration) -> Result<LoadedVariables, LoadError>;
}

/// A source that ignores the selected files and returns a fixed set.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    variables: LoadedVariables,
}

impl SyntheticSource {
    /// Build from explicit variable lists.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Variables`] if either list repeats a name.
    pub fn new(design: Vec<Variable>, test: Vec<Variable>) -> Result<Self, LoadError> {
        Ok(Self {
            variables: LoadedVariables {
                design: VariableSet::new(design)?,
                test: VariableSet::new(test)?,
            },
        })
    }

    /// Build from the `synthetic` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Variables`] if either list repeats a name.
    pub fn from_config(config: &SyntheticConfig) -> Result<Self, LoadError> {
        Self::new(
            config.design_variables.clone(),
            config.test_variables.clone(),
        )
    }

    /// The fixed variable pair.
    pub const fn variables(&self) -> &LoadedVariables {
        &self.variables
    }
}

impl VariableSource for SyntheticSource {
    fn extract(&self, configuration: &RunConfiguration) -> Result<LoadedVariables, LoadError> {
        debug!(
            circuit_file = configuration.circuit_file.as_ref().map(|f| f.name.as_str()),
            "Synthetic source ignores file contents"
        );
        Ok(self.variables.clone())
    }
}

/// Produces fresh variable sets from a configuration.
pub struct ConfigurationLoader {
    source: Box<dyn VariableSource>,
    synthetic: SyntheticSource,
}

impl ConfigurationLoader {
    /// Create a loader with a custom source for gated loads.
    pub fn new(source: Box<dyn VariableSource>, synthetic: SyntheticSource) -> Self {
        Self { source, synthetic }
    }

    /// Create a loader whose gated and bypass loads both use `synthetic`.
    pub fn synthetic(synthetic: SyntheticSource) -> Self {
        Self {
            source: Box::new(synthetic.clone()),
            synthetic,
        }
    }

    /// Load variables for `configuration`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::GateNotSatisfied`] if no circuit file or no
    /// simulator is selected, or any error from the variable source.
    pub fn load(&self, configuration: &RunConfiguration) -> Result<LoadedVariables, LoadError> {
        let violations = gate::check_load(configuration);
        if !violations.is_empty() {
            return Err(LoadError::GateNotSatisfied { violations });
        }
        let variables = self.source.extract(configuration)?;
        info!(
            circuit_file = configuration.circuit_file.as_ref().map(|f| f.name.as_str()),
            preconfig_file = configuration.preconfig_file.as_ref().map(|f| f.name.as_str()),
            simulator = ?configuration.simulator,
            design_count = variables.design.len(),
            test_count = variables.test.len(),
            "Configuration loaded"
        );
        Ok(variables)
    }

    /// Load the fixed development data set, bypassing the gate.
    pub fn load_synthetic(&self) -> LoadedVariables {
        let variables = self.synthetic.variables().clone();
        info!(
            design_count = variables.design.len(),
            test_count = variables.test.len(),
            "Synthetic configuration loaded"
        );
        variables
    }
}

impl core::fmt::Debug for ConfigurationLoader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfigurationLoader")
            .field("synthetic", &self.synthetic)
            .finish_non_exhaustive()
    }
}
