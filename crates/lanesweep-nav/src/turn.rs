//! [`TurnSequencer`] – marker-triggered lane changes.
//!
//! Each tick runs in one of two phases:
//!
//! 1. **Locked** – a turn fired on an earlier tick and the sequencer waits
//!    for a marker with a different id.  Seeing one releases the lock, but the
//!    tick still returns [`Command::Forward`]; turn evaluation resumes on the
//!    next tick.
//! 2. **Armed** – observations within the target distance are checked against
//!    the left/right id sets in received order.  The first match turns the
//!    vehicle, advances the lane counter, and locks on that marker.

use std::collections::BTreeSet;

use lanesweep_types::{Command, MarkerObservation};
use tracing::{info, warn};

use crate::config::NavConfig;
use crate::state::NavigationState;

/// Direction of a 180° lane-change turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn command(self) -> Command {
        match self {
            TurnDirection::Left => Command::TurnLeft180,
            TurnDirection::Right => Command::TurnRight180,
        }
    }
}

/// Decides when to turn and keeps lane bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSequencer {
    target_distance_m: f64,
    lane_width_cm: i32,
    total_lanes: u32,
    left_ids: BTreeSet<i32>,
    right_ids: BTreeSet<i32>,
}

impl TurnSequencer {
    pub fn from_config(config: &NavConfig) -> Self {
        Self {
            target_distance_m: config.target_distance_m,
            lane_width_cm: config.lane_width_cm(),
            total_lanes: config.total_lanes,
            left_ids: config.left_turn_ids.clone(),
            right_ids: config.right_turn_ids.clone(),
        }
    }

    /// Turn direction assigned to `marker_id`, if it is a turn marker.
    pub fn direction_for(&self, marker_id: i32) -> Option<TurnDirection> {
        if self.left_ids.contains(&marker_id) {
            Some(TurnDirection::Left)
        } else if self.right_ids.contains(&marker_id) {
            Some(TurnDirection::Right)
        } else {
            None
        }
    }

    /// Run one tick of the sequencer and return the navigation command.
    pub fn evaluate(
        &self,
        observations: &[MarkerObservation],
        state: &mut NavigationState,
    ) -> Command {
        let command = if state.awaiting_unlock {
            self.release_lock(observations, state);
            Command::Forward
        } else {
            self.try_turn(observations, state)
                .map(TurnDirection::command)
                .unwrap_or(Command::Forward)
        };

        if state.lane_index >= self.total_lanes && !state.coverage_reported {
            warn!(lanes = state.lane_index, "field fully covered");
            state.coverage_reported = true;
        }
        command
    }

    fn release_lock(&self, observations: &[MarkerObservation], state: &mut NavigationState) {
        let Some(locked) = state.locked_marker_id else {
            state.unlock();
            return;
        };
        if let Some(obs) = observations.iter().find(|obs| obs.id != locked) {
            info!(marker_id = obs.id, locked_id = locked, "new marker seen, turn re-armed");
            state.unlock();
        }
    }

    fn try_turn(
        &self,
        observations: &[MarkerObservation],
        state: &mut NavigationState,
    ) -> Option<TurnDirection> {
        let (obs, direction) = observations
            .iter()
            .filter(|obs| obs.distance_m <= self.target_distance_m)
            .find_map(|obs| self.direction_for(obs.id).map(|dir| (obs, dir)))?;

        if state.lane_index < self.total_lanes {
            state.lane_index += 1;
        }
        // The offset tracks distance travelled across the field and keeps
        // growing after the lane count saturates.
        state.lane_offset_cm = state.lane_offset_cm.saturating_add(self.lane_width_cm);
        state.lock(obs.id);

        warn!(
            marker_id = obs.id,
            distance_m = obs.distance_m,
            direction = ?direction,
            lane_index = state.lane_index,
            "turn marker reached, turning 180"
        );
        Some(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequencer() -> TurnSequencer {
        TurnSequencer::from_config(&NavConfig::default())
    }

    fn near(id: i32) -> MarkerObservation {
        MarkerObservation::new(id, 0.10, 0.0)
    }

    #[test]
    fn left_and_right_ids_map_to_directions() {
        let seq = sequencer();
        assert_eq!(seq.direction_for(20), Some(TurnDirection::Left));
        assert_eq!(seq.direction_for(30), Some(TurnDirection::Left));
        assert_eq!(seq.direction_for(10), Some(TurnDirection::Right));
        assert_eq!(seq.direction_for(40), Some(TurnDirection::Right));
        assert_eq!(seq.direction_for(99), None);
    }

    #[test]
    fn near_turn_marker_turns_and_locks() {
        let seq = sequencer();
        let mut state = NavigationState::new();

        assert_eq!(seq.evaluate(&[near(20)], &mut state), Command::TurnLeft180);
        assert_eq!(state.lane_index(), 1);
        assert_eq!(state.lane_offset_cm(), 5);
        assert_eq!(state.locked_marker_id(), Some(20));
        assert!(state.awaiting_unlock());
    }

    #[test]
    fn far_markers_are_skipped_entirely() {
        let seq = sequencer();
        let mut state = NavigationState::new();
        let frame = [MarkerObservation::new(20, 0.16, 0.0), near(10)];
        assert_eq!(seq.evaluate(&frame, &mut state), Command::TurnRight180);
        assert_eq!(state.locked_marker_id(), Some(10));
    }

    #[test]
    fn marker_exactly_at_target_distance_turns() {
        let seq = sequencer();
        let mut state = NavigationState::new();
        let frame = [MarkerObservation::new(40, 0.15, 0.0)];
        assert_eq!(seq.evaluate(&frame, &mut state), Command::TurnRight180);
    }

    #[test]
    fn unknown_ids_never_turn() {
        let seq = sequencer();
        let mut state = NavigationState::new();
        assert_eq!(seq.evaluate(&[near(7)], &mut state), Command::Forward);
        assert_eq!(state.lane_index(), 0);
        assert!(!state.awaiting_unlock());
    }

    #[test]
    fn same_marker_does_not_retrigger() {
        let seq = sequencer();
        let mut state = NavigationState::new();
        seq.evaluate(&[near(20)], &mut state);

        for _ in 0..5 {
            assert_eq!(seq.evaluate(&[near(20)], &mut state), Command::Forward);
        }
        assert_eq!(state.lane_index(), 1);
        assert!(state.awaiting_unlock());
    }

    #[test]
    fn different_marker_unlocks_with_one_tick_latency() {
        let seq = sequencer();
        let mut state = NavigationState::new();
        seq.evaluate(&[near(20)], &mut state);

        // The unlocking marker is itself eligible, but the turn waits a tick.
        assert_eq!(seq.evaluate(&[near(40)], &mut state), Command::Forward);
        assert!(!state.awaiting_unlock());
        assert_eq!(state.locked_marker_id(), None);
        assert_eq!(state.lane_index(), 1);

        assert_eq!(seq.evaluate(&[near(40)], &mut state), Command::TurnRight180);
        assert_eq!(state.lane_index(), 2);
        assert_eq!(state.locked_marker_id(), Some(40));
    }

    #[test]
    fn empty_frame_keeps_lock() {
        let seq = sequencer();
        let mut state = NavigationState::new();
        seq.evaluate(&[near(30)], &mut state);
        assert_eq!(seq.evaluate(&[], &mut state), Command::Forward);
        assert!(state.awaiting_unlock());
    }

    #[test]
    fn lane_index_saturates_at_total_lanes() {
        let cfg = NavConfig {
            total_lanes: 1,
            ..NavConfig::default()
        };
        let seq = TurnSequencer::from_config(&cfg);
        let mut state = NavigationState::new();

        assert_eq!(seq.evaluate(&[near(20)], &mut state), Command::TurnLeft180);
        seq.evaluate(&[near(10)], &mut state); // unlock
        assert_eq!(seq.evaluate(&[near(10)], &mut state), Command::TurnRight180);

        assert_eq!(state.lane_index(), 1);
        assert_eq!(state.lane_offset_cm(), 10);
        assert!(state.coverage_reported);
    }
}
