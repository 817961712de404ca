//! Generic `PerceptionSource` trait for whatever turns camera frames into
//! marker observations and a perimeter-proximity reading.
//!
//! Marker detection, pose solving and perimeter-line segmentation live
//! outside LaneSweep.  The control loop only ever talks to this trait, so a
//! live vision pipeline, a replay file, or a scripted test source can be
//! swapped without touching navigation.

use lanesweep_types::{PerceptionFrame, SweepError};

/// A producer of one [`PerceptionFrame`] per control tick.
///
/// Implementations may block (waiting for the next camera frame); the control
/// loop calls [`next_frame`][PerceptionSource::next_frame] before each tick
/// and never while a tick is running.
pub trait PerceptionSource: Send {
    /// Stable identifier for this source, e.g. `"front_camera"`.
    fn id(&self) -> &str;

    /// Return the next frame, or `Ok(None)` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Perception`] when a frame cannot be produced
    /// (camera unplugged, malformed replay record, …).
    fn next_frame(&mut self) -> Result<Option<PerceptionFrame>, SweepError>;
}
