//! Serial link to the motor controller.
//!
//! Each command travels as its one-byte ASCII code followed by `\n`.  The
//! framing lives in [`LineCommandSink`], which works over any
//! [`std::io::Write`]; [`open_serial`] wraps a real UART opened at 8N1.

use std::io::Write;
use std::thread;
use std::time::Duration;

use lanesweep_types::{Command, SweepError};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::sink::CommandSink;

/// Port the motor controller enumerates as on the vehicle computer.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyACM0";

/// Baud rate the controller firmware expects.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Write timeout on the UART.
const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// The controller resets when the port opens; commands sent before it boots
/// are lost.
const CONTROLLER_BOOT_DELAY: Duration = Duration::from_secs(2);

/// Encode a command as it appears on the wire.
pub fn frame(command: Command) -> [u8; 2] {
    [command.code() as u8, b'\n']
}

/// Writes newline-terminated command codes to `W`.
pub struct LineCommandSink<W: Write + Send> {
    id: String,
    writer: W,
}

impl<W: Write + Send> LineCommandSink<W> {
    pub fn new(id: impl Into<String>, writer: W) -> Self {
        Self {
            id: id.into(),
            writer,
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> CommandSink for LineCommandSink<W> {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&mut self, command: Command) -> Result<(), SweepError> {
        self.writer
            .write_all(&frame(command))
            .and_then(|()| self.writer.flush())
            .map_err(|e| SweepError::HardwareFault {
                component: self.id.clone(),
                details: format!("failed to write command '{command}': {e}"),
            })?;
        debug!(sink = %self.id, command = %command, "command sent");
        Ok(())
    }

    fn close(&mut self) -> Result<(), SweepError> {
        self.writer.flush().map_err(|e| SweepError::HardwareFault {
            component: self.id.clone(),
            details: format!("flush on close failed: {e}"),
        })
    }
}

/// A [`LineCommandSink`] over a UART.
pub type SerialCommandSink = LineCommandSink<Box<dyn SerialPort>>;

/// Open `path` at `baud_rate` (8N1, no flow control) and wait for the
/// controller to come out of reset.
///
/// # Errors
///
/// Returns [`SweepError::HardwareFault`] when the port cannot be opened.
pub fn open_serial(path: &str, baud_rate: u32) -> Result<SerialCommandSink, SweepError> {
    let port = serialport::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(WRITE_TIMEOUT)
        .open()
        .map_err(|e| SweepError::HardwareFault {
            component: format!("serial:{path}"),
            details: format!("cannot open port: {e}"),
        })?;

    thread::sleep(CONTROLLER_BOOT_DELAY);
    info!(port = path, baud_rate, "serial link open");
    Ok(LineCommandSink::new(format!("serial:{path}"), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn frames_are_code_plus_newline() {
        assert_eq!(&frame(Command::Forward), b"F\n");
        assert_eq!(&frame(Command::StepLeft), b"l\n");
        assert_eq!(&frame(Command::Decelerate), b"D\n");
    }

    #[test]
    fn line_sink_writes_each_command_on_its_own_line() {
        let mut sink = LineCommandSink::new("buffer", Vec::new());
        for cmd in [Command::Forward, Command::TurnRight180, Command::Stop] {
            sink.send(cmd).unwrap();
        }
        sink.close().unwrap();
        assert_eq!(sink.into_inner(), b"F\nR\nS\n");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_a_hardware_fault() {
        let mut sink = LineCommandSink::new("serial:test", BrokenPipe);
        let err = sink.send(Command::Forward).unwrap_err();
        match err {
            SweepError::HardwareFault { component, details } => {
                assert_eq!(component, "serial:test");
                assert!(details.contains("unplugged"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn opening_a_missing_port_fails() {
        let result = open_serial("/dev/lanesweep-does-not-exist", DEFAULT_BAUD_RATE);
        assert!(matches!(result, Err(SweepError::HardwareFault { .. })));
    }
}
