//! `lanesweep-nav` – Navigation Arbitration Engine
//!
//! Turns per-frame perception signals into exactly one drive command.
//!
//! # Modules
//!
//! - [`safety`] – [`SafetyClassifier`][safety::SafetyClassifier]: maps the
//!   perimeter-proximity scalar to a [`Zone`][lanesweep_types::Zone] and an
//!   optional `Stop` / `Decelerate` override.
//! - [`lateral`] – [`LateralController`][lateral::LateralController]:
//!   emits `StepLeft` / `StepRight` while a marker drifts beyond the
//!   deviation limit.
//! - [`turn`] – [`TurnSequencer`][turn::TurnSequencer]: fires 180° turns at
//!   lane-boundary markers, counts lanes, and debounces on marker id.
//! - [`arbiter`] – [`CommandArbiter`][arbiter::CommandArbiter]: ordered rule
//!   table that resolves the signals above into one command.
//! - [`engine`] – [`NavigationEngine`][engine::NavigationEngine]: owns the
//!   state and wires the components together per tick.
//! - [`config`] / [`state`] – configuration and mutable state.

pub mod arbiter;
pub mod config;
pub mod engine;
pub mod lateral;
pub mod safety;
pub mod state;
pub mod turn;

pub use arbiter::{ArbitrationRule, CommandArbiter, Signals};
pub use config::NavConfig;
pub use engine::NavigationEngine;
pub use lateral::LateralController;
pub use safety::{SafetyAssessment, SafetyClassifier};
pub use state::{NavigationState, SafetyState};
pub use turn::{TurnDirection, TurnSequencer};
