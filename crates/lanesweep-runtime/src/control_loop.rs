//! [`ControlLoop`] – the per-frame drive cycle.
//!
//! Each iteration:
//!
//! 1. **Perceive** – take the next [`PerceptionFrame`] from the reader
//!    thread that drains the [`PerceptionSource`].
//! 2. **Decide** – run one [`NavigationEngine::tick`].
//! 3. **Act** – hand the command to the [`SinkWorker`] without waiting.
//! 4. **Publish** – replace the [`NavigationSnapshot`] on the watch channel.
//!
//! The source runs on its own thread because it may block indefinitely (a
//! stalled camera or an idle stdin pipe).  The loop waits for frames with a
//! timeout and re-checks the shutdown flag on every timeout, so shutdown is
//! honoured within one [`LoopConfig::shutdown_poll`] even while perception
//! is stuck.
//!
//! The loop ends when the source is exhausted, when the shutdown flag is set,
//! or when perception fails.  Every exit path queues a final
//! [`Command::Stop`] and waits for the sink to flush it.
//!
//! # Example
//!
//! ```rust
//! use lanesweep_hal::{RecordingSink, ScriptedSource};
//! use lanesweep_nav::{NavConfig, NavigationEngine};
//! use lanesweep_runtime::control_loop::{ControlLoop, LoopConfig, LoopEnd};
//! use lanesweep_types::PerceptionFrame;
//!
//! let engine = NavigationEngine::new(NavConfig::default()).unwrap();
//! let source = ScriptedSource::new(vec![PerceptionFrame::default(); 3]);
//! let sink = RecordingSink::new();
//! let log = sink.recorded();
//!
//! let control = ControlLoop::new(engine, Box::new(source), Box::new(sink), LoopConfig::default()).unwrap();
//! let summary = control.run().unwrap();
//!
//! assert_eq!(summary.end, LoopEnd::SourceExhausted);
//! assert_eq!(log.codes(), "FFFS");
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use lanesweep_hal::{CommandSink, PerceptionSource};
use lanesweep_nav::NavigationEngine;
use lanesweep_types::{Command, NavigationSnapshot, PerceptionFrame, SweepError};
use tokio::sync::watch;
use tracing::{debug, error, info, info_span};
use uuid::Uuid;

use crate::sink_worker::{SinkReport, SinkWorker};

/// Default number of commands buffered for the sink worker.
pub const DEFAULT_SINK_QUEUE_CAPACITY: usize = 32;

/// Default wait for a frame before the shutdown flag is checked again.
pub const DEFAULT_SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Tunables for [`ControlLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    pub sink_queue_capacity: usize,
    /// Longest time the loop waits on perception between shutdown checks.
    pub shutdown_poll: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            sink_queue_capacity: DEFAULT_SINK_QUEUE_CAPACITY,
            shutdown_poll: DEFAULT_SHUTDOWN_POLL,
        }
    }
}

type FrameResult = Result<Option<PerceptionFrame>, SweepError>;

/// Why [`ControlLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    SourceExhausted,
    ShutdownRequested,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct LoopSummary {
    pub run_id: Uuid,
    pub end: LoopEnd,
    pub ticks: u64,
    /// Commands dropped because the sink queue was full.
    pub dropped: u64,
    pub sink: SinkReport,
    pub final_snapshot: NavigationSnapshot,
}

/// Owns the engine, the perception source and the sink worker.
pub struct ControlLoop {
    run_id: Uuid,
    engine: NavigationEngine,
    source_id: String,
    /// Taken by the reader thread when [`ControlLoop::run`] starts.
    source: Option<Box<dyn PerceptionSource>>,
    sink: SinkWorker,
    snapshots: watch::Sender<NavigationSnapshot>,
    shutdown: Arc<AtomicBool>,
    dropped: u64,
    shutdown_poll: Duration,
}

impl ControlLoop {
    /// Wire up a loop and start the sink worker.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Channel`] if the sink worker cannot start.
    pub fn new(
        engine: NavigationEngine,
        source: Box<dyn PerceptionSource>,
        sink: Box<dyn CommandSink>,
        config: LoopConfig,
    ) -> Result<Self, SweepError> {
        let sink = SinkWorker::spawn(sink, config.sink_queue_capacity)?;
        let (snapshots, _) = watch::channel(engine.snapshot());
        Ok(Self {
            run_id: Uuid::new_v4(),
            engine,
            source_id: source.id().to_string(),
            source: Some(source),
            sink,
            snapshots,
            shutdown: Arc::new(AtomicBool::new(false)),
            dropped: 0,
            shutdown_poll: config.shutdown_poll,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Receiver for the snapshot published after every tick.
    pub fn subscribe(&self) -> watch::Receiver<NavigationSnapshot> {
        self.snapshots.subscribe()
    }

    /// Flag that, once set, ends [`run`][ControlLoop::run] within one
    /// [`LoopConfig::shutdown_poll`], even if perception is blocked.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn engine(&self) -> &NavigationEngine {
        &self.engine
    }

    /// Run one perceive–decide–act–publish cycle on the calling thread.
    ///
    /// Returns `Ok(None)` once the source is exhausted.  Blocks for as long
    /// as the source does; [`run`][ControlLoop::run] does not.
    ///
    /// # Errors
    ///
    /// Propagates perception failures and a dead sink worker.
    pub fn step(&mut self) -> Result<Option<Command>, SweepError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let Some(frame) = source.next_frame()? else {
            return Ok(None);
        };
        Ok(Some(self.apply(&frame)?))
    }

    /// Drive the loop until the source ends, shutdown is requested, or an
    /// error occurs.
    ///
    /// # Errors
    ///
    /// Returns the perception or channel error that ended the run, after the
    /// final `Stop` has been flushed.
    pub fn run(mut self) -> Result<LoopSummary, SweepError> {
        let span = info_span!("sweep", run_id = %self.run_id);
        let _enter = span.enter();
        info!(source = %self.source_id, sink = self.sink.sink_id(), "control loop started");

        let outcome = match self.source.take() {
            Some(source) => match spawn_reader(source) {
                Ok(frames) => self.drive(&frames),
                Err(e) => Err(e),
            },
            None => Ok(LoopEnd::SourceExhausted),
        };
        if let Err(e) = &outcome {
            error!(error = %e, "control loop aborted");
        }

        self.finish(outcome)
    }

    fn drive(&mut self, frames: &Receiver<FrameResult>) -> Result<LoopEnd, SweepError> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("shutdown requested");
                return Ok(LoopEnd::ShutdownRequested);
            }
            match frames.recv_timeout(self.shutdown_poll) {
                Ok(Ok(Some(frame))) => {
                    self.apply(&frame)?;
                }
                Ok(Ok(None)) => {
                    info!(source = %self.source_id, "perception source exhausted");
                    return Ok(LoopEnd::SourceExhausted);
                }
                Ok(Err(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SweepError::Channel(format!(
                        "perception reader for {} stopped",
                        self.source_id
                    )));
                }
            }
        }
    }

    fn apply(&mut self, frame: &PerceptionFrame) -> Result<Command, SweepError> {
        let command = self.engine.tick_frame(frame);
        if !self.sink.submit(command)? {
            self.dropped += 1;
        }
        self.snapshots.send_replace(self.engine.snapshot());
        Ok(command)
    }

    fn finish(self, outcome: Result<LoopEnd, SweepError>) -> Result<LoopSummary, SweepError> {
        if let Err(e) = self.sink.submit_blocking(Command::Stop) {
            error!(error = %e, "final stop could not be queued");
        }
        let sink = self.sink.shutdown()?;
        let final_snapshot = self.engine.snapshot();
        let end = outcome?;

        info!(
            ticks = self.engine.ticks(),
            lane_index = final_snapshot.lane_index,
            dropped = self.dropped,
            sent = sink.sent,
            "control loop finished"
        );
        Ok(LoopSummary {
            run_id: self.run_id,
            end,
            ticks: self.engine.ticks(),
            dropped: self.dropped,
            sink,
            final_snapshot,
        })
    }
}

/// Drain `source` on its own thread.  The channel holds one frame so the
/// reader never runs ahead of the loop.  When the loop stops listening the
/// thread exits at its next send.  A read that never returns leaves the
/// thread parked until process exit.
fn spawn_reader(mut source: Box<dyn PerceptionSource>) -> Result<Receiver<FrameResult>, SweepError> {
    let (tx, rx) = mpsc::sync_channel(1);
    let name = format!("perception-{}", source.id());
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            loop {
                let frame = source.next_frame();
                let last = !matches!(frame, Ok(Some(_)));
                if tx.send(frame).is_err() {
                    debug!(source = source.id(), "control loop gone, perception reader exiting");
                    break;
                }
                if last {
                    break;
                }
            }
        })
        .map_err(|e| SweepError::Channel(format!("cannot spawn perception reader: {e}")))?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanesweep_hal::{RecordingSink, ReplaySource, ScriptedSource};
    use lanesweep_nav::NavConfig;
    use lanesweep_types::MarkerObservation;
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::mpsc as std_mpsc;
    use std::time::Instant;

    fn engine() -> NavigationEngine {
        NavigationEngine::new(NavConfig::default()).unwrap()
    }

    fn frame(observations: Vec<MarkerObservation>, perimeter_proximity: i32) -> PerceptionFrame {
        PerceptionFrame {
            observations,
            perimeter_proximity,
            ..PerceptionFrame::default()
        }
    }

    /// Yields its frames, then blocks until the test drops the sender.
    struct StallingSource {
        frames: VecDeque<PerceptionFrame>,
        release: std_mpsc::Receiver<()>,
    }

    impl PerceptionSource for StallingSource {
        fn id(&self) -> &str {
            "stalling"
        }

        fn next_frame(&mut self) -> Result<Option<PerceptionFrame>, SweepError> {
            if let Some(frame) = self.frames.pop_front() {
                return Ok(Some(frame));
            }
            let _ = self.release.recv();
            Ok(None)
        }
    }

    #[test]
    fn commands_reach_sink_in_tick_order_followed_by_stop() {
        let frames = vec![
            frame(vec![MarkerObservation::new(20, 0.40, 0.0)], 0),
            frame(vec![MarkerObservation::new(20, 0.40, 2.5)], 0),
            frame(vec![MarkerObservation::new(20, 0.10, 0.0)], 0),
            frame(vec![MarkerObservation::new(20, 0.10, 0.0)], 300),
            frame(vec![], 500),
        ];
        let sink = RecordingSink::new();
        let log = sink.recorded();
        let control = ControlLoop::new(
            engine(),
            Box::new(ScriptedSource::new(frames)),
            Box::new(sink),
            LoopConfig::default(),
        )
        .unwrap();

        let summary = control.run().unwrap();
        assert_eq!(summary.end, LoopEnd::SourceExhausted);
        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.sink.sent, 6);
        assert_eq!(log.codes(), "FrLDSS");
        assert_eq!(summary.final_snapshot.lane_index, 1);
    }

    #[test]
    fn snapshots_are_published_after_each_step() {
        let frames = vec![frame(vec![MarkerObservation::new(10, 0.05, 0.0)], 0)];
        let mut control = ControlLoop::new(
            engine(),
            Box::new(ScriptedSource::new(frames)),
            Box::new(RecordingSink::new()),
            LoopConfig::default(),
        )
        .unwrap();
        let rx = control.subscribe();
        assert_eq!(rx.borrow().tick, 0);

        assert_eq!(control.step().unwrap(), Some(Command::TurnRight180));
        let snap = rx.borrow().clone();
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.lane_index, 1);
        assert_eq!(snap.locked_marker_id, Some(10));
        assert_eq!(snap.last_command, Some(Command::TurnRight180));

        assert_eq!(control.step().unwrap(), None);
    }

    #[test]
    fn shutdown_flag_stops_before_next_frame() {
        let sink = RecordingSink::new();
        let log = sink.recorded();
        let control = ControlLoop::new(
            engine(),
            Box::new(ScriptedSource::new(vec![PerceptionFrame::default(); 10])),
            Box::new(sink),
            LoopConfig::default(),
        )
        .unwrap();
        control.shutdown_handle().store(true, Ordering::SeqCst);

        let summary = control.run().unwrap();
        assert_eq!(summary.end, LoopEnd::ShutdownRequested);
        assert_eq!(summary.ticks, 0);
        assert_eq!(log.codes(), "S");
    }

    #[test]
    fn perception_failure_ends_run_with_stop() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"perimeter_proximity\":0}}").unwrap();
        writeln!(file, "garbage").unwrap();
        file.flush().unwrap();

        let sink = RecordingSink::new();
        let log = sink.recorded();
        let control = ControlLoop::new(
            engine(),
            Box::new(ReplaySource::open(file.path()).unwrap()),
            Box::new(sink),
            LoopConfig::default(),
        )
        .unwrap();

        let err = control.run().unwrap_err();
        assert!(matches!(err, SweepError::Perception(_)));
        assert_eq!(log.codes(), "FS");
    }

    #[test]
    fn shutdown_is_honoured_while_perception_is_stalled() {
        let (release_tx, release) = std_mpsc::channel();
        let source = StallingSource {
            frames: VecDeque::from([PerceptionFrame::default()]),
            release,
        };
        let sink = RecordingSink::new();
        let log = sink.recorded();
        let control = ControlLoop::new(
            engine(),
            Box::new(source),
            Box::new(sink),
            LoopConfig {
                shutdown_poll: Duration::from_millis(10),
                ..LoopConfig::default()
            },
        )
        .unwrap();

        let shutdown = control.shutdown_handle();
        let watcher_log = log.clone();
        let watcher = thread::spawn(move || {
            while watcher_log.codes().is_empty() {
                thread::sleep(Duration::from_millis(5));
            }
            // The source is now parked waiting for a frame that never comes.
            thread::sleep(Duration::from_millis(50));
            shutdown.store(true, Ordering::SeqCst);
            Instant::now()
        });

        let summary = control.run().unwrap();
        let returned = Instant::now();
        let requested = watcher.join().unwrap();

        assert_eq!(summary.end, LoopEnd::ShutdownRequested);
        assert_eq!(summary.ticks, 1);
        assert_eq!(log.codes(), "FS");
        assert!(returned.duration_since(requested) < Duration::from_secs(1));
        drop(release_tx);
    }
}
