//! `lanesweep-runtime` – the drive loop around the navigation engine
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: pulls a
//!   frame, ticks the [`NavigationEngine`][lanesweep_nav::NavigationEngine],
//!   queues the command and publishes a
//!   [`NavigationSnapshot`][lanesweep_types::NavigationSnapshot] on a watch
//!   channel.  Every exit path ends with a final `Stop`.
//! - [`sink_worker`] – [`SinkWorker`][sink_worker::SinkWorker]: moves the
//!   [`CommandSink`][lanesweep_hal::CommandSink] onto its own thread behind a
//!   bounded queue so slow serial writes never stall perception.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console, file
//!   and optional OTLP output for `tracing`.

pub mod control_loop;
pub mod sink_worker;
pub mod telemetry;

pub use control_loop::{ControlLoop, LoopConfig, LoopEnd, LoopSummary};
pub use sink_worker::{SinkReport, SinkWorker};
pub use telemetry::{TelemetryConfig, TelemetryGuard, init_tracing};
