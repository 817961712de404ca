//! `lanesweep-hal` – Hardware Abstraction Layer
//!
//! The seams between the navigation engine and the outside world.
//!
//! # Modules
//!
//! - [`perception`] – [`PerceptionSource`]: yields one
//!   [`PerceptionFrame`][lanesweep_types::PerceptionFrame] per tick.
//! - [`sink`] – [`CommandSink`]: receives drive commands.
//! - [`serial`] – [`LineCommandSink`][serial::LineCommandSink] and
//!   [`open_serial`][serial::open_serial]: the newline-framed UART link to
//!   the motor controller.
//! - [`replay`] – [`ReplaySource`][replay::ReplaySource]: JSON Lines
//!   playback of recorded frames.
//! - [`sim`] – scripted source, recording sink and a log-only simulated
//!   controller link.

pub mod perception;
pub mod replay;
pub mod serial;
pub mod sim;
pub mod sink;

pub use perception::PerceptionSource;
pub use replay::ReplaySource;
pub use serial::{LineCommandSink, SerialCommandSink, open_serial};
pub use sim::{RecordedCommands, RecordingSink, ScriptedSource, SimulatedSink};
pub use sink::CommandSink;
