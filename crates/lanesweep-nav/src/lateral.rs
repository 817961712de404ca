//! [`LateralController`] – keeps the vehicle centred on its lane.
//!
//! Observations are scanned in the order perception delivered them.  The
//! first one whose lateral offset exceeds the deviation limit decides the
//! step direction, even if a later observation deviates further.  Entry and
//! exit share the same limit, so an offset hovering exactly at the limit can
//! alternate between correcting and not correcting on consecutive ticks.

use lanesweep_types::{Command, MarkerObservation};
use tracing::{info, warn};

use crate::state::NavigationState;

/// Emits [`Command::StepLeft`] / [`Command::StepRight`] micro-corrections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateralController {
    deviation_limit_cm: f64,
}

impl LateralController {
    pub fn new(deviation_limit_cm: f64) -> Self {
        Self { deviation_limit_cm }
    }

    /// Return the corrective step for this tick, or `None` when every
    /// observation is within the limit.
    ///
    /// Clears `correcting` (and the per-marker distance log) on the first
    /// aligned tick after a correction.
    pub fn evaluate(
        &self,
        observations: &[MarkerObservation],
        state: &mut NavigationState,
    ) -> Option<Command> {
        let offender = observations
            .iter()
            .find(|obs| obs.lateral_cm.abs() > self.deviation_limit_cm);

        if let Some(obs) = offender {
            let step = if obs.lateral_cm > 0.0 {
                Command::StepRight
            } else {
                Command::StepLeft
            };
            if !state.correcting {
                warn!(
                    marker_id = obs.id,
                    lateral_cm = obs.lateral_cm,
                    step = %step,
                    "lateral drift beyond limit, correcting"
                );
                state.correcting = true;
            }
            return Some(step);
        }

        if state.correcting {
            info!("lateral correction complete, aligned");
            state.correcting = false;
            state.last_logged_distance.clear();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(id: i32, lateral_cm: f64) -> MarkerObservation {
        MarkerObservation::new(id, 0.5, lateral_cm)
    }

    #[test]
    fn positive_deviation_steps_right() {
        let ctl = LateralController::new(1.0);
        let mut state = NavigationState::new();
        assert_eq!(ctl.evaluate(&[obs(20, 2.0)], &mut state), Some(Command::StepRight));
        assert!(state.correcting());
    }

    #[test]
    fn negative_deviation_steps_left() {
        let ctl = LateralController::new(1.0);
        let mut state = NavigationState::new();
        assert_eq!(ctl.evaluate(&[obs(20, -1.5)], &mut state), Some(Command::StepLeft));
    }

    #[test]
    fn deviation_at_limit_does_not_correct() {
        let ctl = LateralController::new(1.0);
        let mut state = NavigationState::new();
        assert_eq!(ctl.evaluate(&[obs(20, 1.0), obs(30, -1.0)], &mut state), None);
        assert!(!state.correcting());
    }

    #[test]
    fn first_offender_in_order_wins() {
        let ctl = LateralController::new(1.0);
        let mut state = NavigationState::new();
        let frame = [obs(10, 0.2), obs(20, -1.2), obs(30, 5.0)];
        for _ in 0..10 {
            assert_eq!(ctl.evaluate(&frame, &mut state), Some(Command::StepLeft));
        }
    }

    #[test]
    fn correction_clears_when_aligned_and_resets_distance_log() {
        let ctl = LateralController::new(1.0);
        let mut state = NavigationState::new();
        state.last_logged_distance.insert(20, 40);

        ctl.evaluate(&[obs(20, 1.5)], &mut state);
        assert!(state.correcting());

        assert_eq!(ctl.evaluate(&[obs(20, 0.5)], &mut state), None);
        assert!(!state.correcting());
        assert_eq!(state.last_logged_distance(20), None);
    }

    #[test]
    fn empty_frame_keeps_uncorrected_state() {
        let ctl = LateralController::new(1.0);
        let mut state = NavigationState::new();
        assert_eq!(ctl.evaluate(&[], &mut state), None);
        assert!(!state.correcting());
    }
}
