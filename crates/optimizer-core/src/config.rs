//! Configuration loading and typed config structures for the optimizer.
//!
//! The canonical configuration lives in `optimizer-config.yaml` at the
//! project root. Every section and field has a default, so an empty or
//! missing file yields a working configuration.

use std::path::Path;

use optimizer_types::Variable;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level optimizer configuration.
///
/// Mirrors the structure of `optimizer-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OptimizerConfig {
    /// Run ticker settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Synthetic variable source and progress backend.
    #[serde(default)]
    pub synthetic: SyntheticConfig,

    /// Observer HTTP server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OptimizerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the observer
    /// address:
    /// - `OPTIMIZER_HOST` overrides `observer.host`
    /// - `OPTIMIZER_PORT` overrides `observer.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document carries no sections.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config
            .observer
            .apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }
}

/// Run ticker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunnerConfig {
    /// Milliseconds between progress ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks after which an unfinished run fails (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
        }
    }
}

/// Synthetic stand-in for file extraction and for the simulator backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyntheticConfig {
    /// Seed for reproducible progress sequences. Unset draws from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Upper bound (exclusive) of the per-tick progress increment.
    #[serde(default = "default_max_increment")]
    pub max_increment: f64,

    /// Number of simulated corners named in tick log lines.
    #[serde(default = "default_corner_count")]
    pub corner_count: u32,

    /// Design variables produced by every load.
    #[serde(default = "default_design_variables")]
    pub design_variables: Vec<Variable>,

    /// Test variables produced by every load.
    #[serde(default = "default_test_variables")]
    pub test_variables: Vec<Variable>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_increment: default_max_increment(),
            corner_count: default_corner_count(),
            design_variables: default_design_variables(),
            test_variables: default_test_variables(),
        }
    }
}

/// Observer HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Address to bind.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

impl ObserverConfig {
    /// Apply `OPTIMIZER_HOST` / `OPTIMIZER_PORT` overrides from `lookup`.
    ///
    /// An unparseable port is ignored and the configured value kept.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("OPTIMIZER_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("OPTIMIZER_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(e) => {
                    tracing::warn!(value = %port, error = %e, "Ignoring invalid OPTIMIZER_PORT");
                }
            }
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    800
}

const fn default_max_increment() -> f64 {
    15.0
}

const fn default_corner_count() -> u32 {
    5
}

fn default_design_variables() -> Vec<Variable> {
    vec![
        Variable::bounded("v_bias_1", 0.8, 1.2),
        Variable::bounded("i_ref_main", 1e-5, 5e-5),
        Variable::bounded("w_nmos_diff", 1e-6, 1e-5),
        Variable::bounded("l_pmos_casc", 1.8e-7, 1e-6),
        Variable::bounded("res_value", 1000.0, 10000.0),
        Variable::bounded("cap_value", 1e-12, 1e-11),
    ]
}

fn default_test_variables() -> Vec<Variable> {
    vec![
        Variable::bounded("temp_corner", -40.0, 125.0),
        Variable::bounded("vdd_corner", 1.62, 1.98),
    ]
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}
