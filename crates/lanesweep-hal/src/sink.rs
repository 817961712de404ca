//! Generic `CommandSink` trait for the drive controller link.

use lanesweep_types::{Command, SweepError};

/// Destination for the engine's drive commands (serial link to the motor
/// controller, a log, a test recorder, …).
///
/// Sinks may block on I/O.  The runtime drives them from a dedicated worker
/// thread so their latency never reaches the navigation engine.
pub trait CommandSink: Send {
    /// Stable identifier for this sink, e.g. `"serial:/dev/ttyACM0"`.
    fn id(&self) -> &str;

    /// Deliver one command.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::HardwareFault`] if the command cannot be written.
    fn send(&mut self, command: Command) -> Result<(), SweepError>;

    /// Release the underlying link.  The default does nothing.
    fn close(&mut self) -> Result<(), SweepError> {
        Ok(())
    }
}
