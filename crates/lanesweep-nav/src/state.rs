//! Mutable per-run state owned by the [`NavigationEngine`][crate::NavigationEngine].
//!
//! Fields are crate-private so only the component responsible for a field can
//! change it; read access goes through the accessor methods.

use std::collections::HashMap;

use lanesweep_types::Zone;

/// Lane bookkeeping, correction flag and turn lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    pub(crate) lane_index: u32,
    pub(crate) lane_offset_cm: i32,
    pub(crate) correcting: bool,
    pub(crate) locked_marker_id: Option<i32>,
    pub(crate) awaiting_unlock: bool,
    /// Last distance (whole cm) announced per marker id.
    pub(crate) last_logged_distance: HashMap<i32, i64>,
    pub(crate) coverage_reported: bool,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lane changes performed so far.
    pub fn lane_index(&self) -> u32 {
        self.lane_index
    }

    /// Accumulated lateral offset of the current lane, in centimetres.
    pub fn lane_offset_cm(&self) -> i32 {
        self.lane_offset_cm
    }

    /// `true` while a lateral correction is in progress.
    pub fn correcting(&self) -> bool {
        self.correcting
    }

    /// The marker that triggered the most recent turn, while locked.
    pub fn locked_marker_id(&self) -> Option<i32> {
        self.locked_marker_id
    }

    /// `true` until a marker different from the locked one is observed.
    pub fn awaiting_unlock(&self) -> bool {
        self.awaiting_unlock
    }

    /// Last announced distance for `marker_id`, in whole centimetres.
    pub fn last_logged_distance(&self, marker_id: i32) -> Option<i64> {
        self.last_logged_distance.get(&marker_id).copied()
    }

    pub(crate) fn lock(&mut self, marker_id: i32) {
        self.locked_marker_id = Some(marker_id);
        self.awaiting_unlock = true;
    }

    pub(crate) fn unlock(&mut self) {
        self.locked_marker_id = None;
        self.awaiting_unlock = false;
    }
}

/// Perimeter safety state.  `last_logged_zone` only suppresses duplicate
/// notifications.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafetyState {
    pub(crate) zone: Zone,
    pub(crate) last_logged_zone: Option<Zone>,
}

impl SafetyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zone computed on the most recent tick.
    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Zone last announced in the log, if any.
    pub fn last_logged_zone(&self) -> Option<Zone> {
        self.last_logged_zone
    }
}
