//! [`SinkWorker`] – runs a [`CommandSink`] on its own thread.
//!
//! Serial writes can stall for as long as the UART timeout.  The control loop
//! hands commands to the worker through a bounded channel with
//! [`SinkWorker::submit`], which never waits: when the queue is full the
//! command is dropped and a warning is logged.  Delivery failures are logged
//! by the worker and counted in the final [`SinkReport`]; they never stop the
//! loop.

use std::thread::{self, JoinHandle};

use lanesweep_hal::CommandSink;
use lanesweep_types::{Command, SweepError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};

/// Delivery statistics returned when the worker shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Commands the sink accepted.
    pub sent: u64,
    /// Commands the sink rejected.
    pub failed: u64,
}

/// Handle to a sink running on a dedicated thread.
pub struct SinkWorker {
    sink_id: String,
    tx: mpsc::Sender<Command>,
    handle: JoinHandle<SinkReport>,
}

impl SinkWorker {
    /// Move `sink` onto a new thread fed by a queue of `capacity` commands.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Channel`] if the thread cannot be spawned.
    pub fn spawn(sink: Box<dyn CommandSink>, capacity: usize) -> Result<Self, SweepError> {
        let sink_id = sink.id().to_string();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = thread::Builder::new()
            .name(format!("sink-{sink_id}"))
            .spawn(move || drain(sink, rx))
            .map_err(|e| SweepError::Channel(format!("cannot spawn sink worker: {e}")))?;
        Ok(Self {
            sink_id,
            tx,
            handle,
        })
    }

    pub fn sink_id(&self) -> &str {
        &self.sink_id
    }

    /// Queue `command` without waiting.
    ///
    /// Returns `Ok(false)` when the queue was full and the command dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Channel`] when the worker has exited.
    pub fn submit(&self, command: Command) -> Result<bool, SweepError> {
        match self.tx.try_send(command) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(command)) => {
                warn!(sink = %self.sink_id, command = %command, "sink queue full, command dropped");
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(self.closed()),
        }
    }

    /// Queue `command`, waiting for space if necessary.  Reserved for the
    /// final `Stop`, which must not be dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Channel`] when the worker has exited.
    pub fn submit_blocking(&self, command: Command) -> Result<(), SweepError> {
        self.tx.blocking_send(command).map_err(|_| self.closed())
    }

    /// Close the queue, let the worker flush what is pending, and join it.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Channel`] if the worker thread panicked.
    pub fn shutdown(self) -> Result<SinkReport, SweepError> {
        let Self {
            sink_id,
            tx,
            handle,
        } = self;
        drop(tx);
        handle
            .join()
            .map_err(|_| SweepError::Channel(format!("sink worker {sink_id} panicked")))
    }

    fn closed(&self) -> SweepError {
        SweepError::Channel(format!("sink worker {} is not running", self.sink_id))
    }
}

fn drain(mut sink: Box<dyn CommandSink>, mut rx: mpsc::Receiver<Command>) -> SinkReport {
    let mut report = SinkReport::default();
    while let Some(command) = rx.blocking_recv() {
        match sink.send(command) {
            Ok(()) => report.sent += 1,
            Err(e) => {
                error!(sink = sink.id(), command = %command, error = %e, "command delivery failed");
                report.failed += 1;
            }
        }
    }
    if let Err(e) = sink.close() {
        error!(sink = sink.id(), error = %e, "sink close failed");
    }
    info!(sink = sink.id(), sent = report.sent, failed = report.failed, "sink worker stopped");
    report
}
