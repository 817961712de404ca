//! In-process stand-ins for the camera pipeline and the motor controller.
//!
//! Used for dry runs on a laptop (`--simulate`) and for headless tests of the
//! control loop.
//!
//! # Example
//!
//! ```rust
//! use lanesweep_hal::sim::{RecordingSink, ScriptedSource};
//! use lanesweep_hal::{CommandSink, PerceptionSource};
//! use lanesweep_types::{Command, PerceptionFrame};
//!
//! let mut source = ScriptedSource::new(vec![PerceptionFrame::default()]);
//! assert!(source.next_frame().unwrap().is_some());
//! assert!(source.next_frame().unwrap().is_none());
//!
//! let mut sink = RecordingSink::new();
//! let log = sink.recorded();
//! sink.send(Command::Forward).unwrap();
//! assert_eq!(log.commands(), vec![Command::Forward]);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use lanesweep_types::{Command, PerceptionFrame, SweepError};
use tracing::{debug, info};

use crate::perception::PerceptionSource;
use crate::sink::CommandSink;

// ────────────────────────────────────────────────────────────────────────────
// Scripted perception
// ────────────────────────────────────────────────────────────────────────────

/// Yields a fixed list of frames, then reports exhaustion.
pub struct ScriptedSource {
    id: String,
    frames: VecDeque<PerceptionFrame>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<PerceptionFrame>) -> Self {
        Self {
            id: "scripted".to_string(),
            frames: frames.into(),
        }
    }

    /// Frames not yet consumed.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl PerceptionSource for ScriptedSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn next_frame(&mut self) -> Result<Option<PerceptionFrame>, SweepError> {
        Ok(self.frames.pop_front())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recording sink
// ────────────────────────────────────────────────────────────────────────────

/// Shared view of the commands a [`RecordingSink`] has received.
///
/// Stays readable after the sink itself has moved to a worker thread.
#[derive(Clone, Default)]
pub struct RecordedCommands(Arc<Mutex<Vec<Command>>>);

impl RecordedCommands {
    pub fn commands(&self) -> Vec<Command> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Wire codes of everything recorded, concatenated.
    pub fn codes(&self) -> String {
        self.commands().into_iter().map(Command::code).collect()
    }
}

/// Records every command it receives.  Always succeeds.
pub struct RecordingSink {
    recorded: RecordedCommands,
    closed: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            recorded: RecordedCommands::default(),
            closed: false,
        }
    }

    /// Handle to the recorded command log.
    pub fn recorded(&self) -> RecordedCommands {
        self.recorded.clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSink for RecordingSink {
    fn id(&self) -> &str {
        "recording"
    }

    fn send(&mut self, command: Command) -> Result<(), SweepError> {
        if self.closed {
            return Err(SweepError::HardwareFault {
                component: "recording".to_string(),
                details: "sink already closed".to_string(),
            });
        }
        self.recorded
            .0
            .lock()
            .map_err(|_| SweepError::Channel("recording sink poisoned".to_string()))?
            .push(command);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SweepError> {
        self.closed = true;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated controller link
// ────────────────────────────────────────────────────────────────────────────

/// Replaces the serial link when no controller is attached; commands are only
/// logged.
pub struct SimulatedSink {
    sent: u64,
}

impl SimulatedSink {
    pub fn new() -> Self {
        info!("serial simulation active, commands are logged only");
        Self { sent: 0 }
    }
}

impl Default for SimulatedSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSink for SimulatedSink {
    fn id(&self) -> &str {
        "simulated"
    }

    fn send(&mut self, command: Command) -> Result<(), SweepError> {
        self.sent += 1;
        debug!(command = %command, seq = self.sent, "simulated send");
        Ok(())
    }

    fn close(&mut self) -> Result<(), SweepError> {
        info!(sent = self.sent, "serial simulation closed");
        Ok(())
    }
}
