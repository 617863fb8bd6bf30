//! Shared type definitions for the circuit optimizer control surface.
//!
//! This crate is the single source of truth for the records exchanged
//! between the session controller and its presentation layer. Types
//! defined here flow downstream to `TypeScript` via `ts-rs` for the
//! browser front end.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for run identifiers
//! - [`enums`] -- Simulator choice, run status, and edit addressing
//! - [`variables`] -- Bounded variables and ordered variable sets
//! - [`structs`] -- Run configuration, run state, snapshot, and events

pub mod enums;
pub mod ids;
pub mod structs;
pub mod variables;

// Re-export all public types at crate root for convenience.
pub use enums::{BoundField, NoticeLevel, RunStatus, Simulator, VariableSetKind};
pub use ids::RunId;
pub use structs::{
    FileHandle, LogEntry, RunConfiguration, SessionEvent, SessionSnapshot, SimulationRun,
};
pub use variables::{Variable, VariableSet, VariableSetError};
