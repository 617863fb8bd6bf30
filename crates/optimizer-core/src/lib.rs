//! Run gating, configuration loading, and run orchestration for the
//! circuit optimizer control surface.
//!
//! # Modules
//!
//! - [`backend`] -- [`SimulatorBackend`] / [`ProgressSource`] traits and
//!   the [`SyntheticBackend`] stand-in.
//! - [`config`] -- Configuration loading from `optimizer-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- Stop signalling shared between a run driver and its
//!   callers.
//! - [`gate`] -- The load and run readiness gates.
//! - [`loader`] -- [`ConfigurationLoader`] and the [`VariableSource`] seam.
//! - [`runner`] -- The [`SimulationRunner`] state machine.
//! - [`session`] -- [`SessionController`], the serialised owner of all
//!   session state.
//!
//! [`SimulatorBackend`]: backend::SimulatorBackend
//! [`ProgressSource`]: backend::ProgressSource
//! [`SyntheticBackend`]: backend::SyntheticBackend
//! [`ConfigurationLoader`]: loader::ConfigurationLoader
//! [`VariableSource`]: loader::VariableSource
//! [`SimulationRunner`]: runner::SimulationRunner
//! [`SessionController`]: session::SessionController

pub mod backend;
pub mod config;
pub mod control;
pub mod gate;
pub mod loader;
pub mod runner;
pub mod session;
