//! [`ReplaySource`] – feeds recorded perception frames back into the loop.
//!
//! A replay file holds one JSON-encoded [`PerceptionFrame`] per line:
//!
//! ```text
//! # approach marker 20, then turn
//! {"observations":[{"id":20,"distance_m":0.40,"lateral_cm":0.3}],"perimeter_proximity":0}
//! {"observations":[{"id":20,"distance_m":0.12,"lateral_cm":0.1}],"perimeter_proximity":0}
//! {"perimeter_proximity":380}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.  An optional frame
//! interval paces playback at camera speed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::Duration;

use lanesweep_types::{PerceptionFrame, SweepError};

use crate::perception::PerceptionSource;

/// Reads [`PerceptionFrame`]s from JSON Lines.
pub struct ReplaySource<R: BufRead + Send> {
    id: String,
    reader: R,
    line_no: usize,
    interval: Option<Duration>,
}

impl ReplaySource<BufReader<File>> {
    /// Open a replay file.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Perception`] when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SweepError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SweepError::Perception(format!("cannot open replay {}: {e}", path.display()))
        })?;
        Ok(Self::new(
            format!("replay:{}", path.display()),
            BufReader::new(file),
        ))
    }
}

impl<R: BufRead + Send> ReplaySource<R> {
    pub fn new(id: impl Into<String>, reader: R) -> Self {
        Self {
            id: id.into(),
            reader,
            line_no: 0,
            interval: None,
        }
    }

    /// Sleep `interval` before yielding each frame.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl<R: BufRead + Send> PerceptionSource for ReplaySource<R> {
    fn id(&self) -> &str {
        &self.id
    }

    fn next_frame(&mut self) -> Result<Option<PerceptionFrame>, SweepError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).map_err(|e| {
                SweepError::Perception(format!("{}: read failed after line {}: {e}", self.id, self.line_no))
            })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let record = line.trim();
            if record.is_empty() || record.starts_with('#') {
                continue;
            }
            let frame = serde_json::from_str(record).map_err(|e| {
                SweepError::Perception(format!("{}: line {}: {e}", self.id, self.line_no))
            })?;
            if let Some(interval) = self.interval {
                thread::sleep(interval);
            }
            return Ok(Some(frame));
        }
    }
}
