//! [`SafetyClassifier`] – perimeter-proximity zoning.
//!
//! The proximity scalar grows as the vehicle approaches the field boundary.
//! Two thresholds split it into three zones:
//!
//! | Zone | Condition | Override |
//! |------|-----------|----------|
//! | [`Zone::Safe`] | `p <= caution` | none |
//! | [`Zone::Caution`] | `caution < p <= critical` | [`Command::Decelerate`] |
//! | [`Zone::Critical`] | `p > critical` | [`Command::Stop`] |
//!
//! Zone changes are announced once; an unchanged zone is never re-announced.
//! Easing from Critical back to Caution is not announced.

use lanesweep_types::{Command, Zone};
use tracing::{error, info, warn};

use crate::state::SafetyState;

/// Result of classifying one proximity reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyAssessment {
    pub zone: Zone,
    /// Command that must override navigation, if any.
    pub override_command: Option<Command>,
    /// `true` when this reading moved the vehicle into a different zone.
    pub changed: bool,
    /// `true` when the change was logged.
    pub announced: bool,
}

/// Maps the perimeter-proximity scalar to a [`Zone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyClassifier {
    caution_threshold: i32,
    critical_threshold: i32,
}

impl SafetyClassifier {
    pub fn new(caution_threshold: i32, critical_threshold: i32) -> Self {
        Self {
            caution_threshold,
            critical_threshold,
        }
    }

    /// Zone for a proximity reading.  Negative or otherwise implausible
    /// values fall into [`Zone::Safe`].
    pub fn zone_for(&self, proximity: i32) -> Zone {
        if proximity > self.critical_threshold {
            Zone::Critical
        } else if proximity > self.caution_threshold {
            Zone::Caution
        } else {
            Zone::Safe
        }
    }

    /// Classify `proximity`, update `state`, and announce zone changes.
    pub fn classify(&self, proximity: i32, state: &mut SafetyState) -> SafetyAssessment {
        let zone = self.zone_for(proximity);
        state.zone = zone;

        let changed = state.last_logged_zone != Some(zone);
        let announced =
            changed && !(zone == Zone::Caution && state.last_logged_zone == Some(Zone::Critical));
        if announced {
            match zone {
                Zone::Critical => {
                    error!(proximity, threshold = self.critical_threshold, "perimeter critical, forcing stop")
                }
                Zone::Caution => {
                    warn!(proximity, threshold = self.caution_threshold, "perimeter close, decelerating")
                }
                Zone::Safe => info!(proximity, "perimeter clear"),
            }
        }
        if changed {
            state.last_logged_zone = Some(zone);
        }

        SafetyAssessment {
            zone,
            override_command: override_for(zone),
            changed,
            announced,
        }
    }
}

/// The override command a zone imposes on navigation.
pub fn override_for(zone: Zone) -> Option<Command> {
    match zone {
        Zone::Safe => None,
        Zone::Caution => Some(Command::Decelerate),
        Zone::Critical => Some(Command::Stop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SafetyClassifier {
        SafetyClassifier::new(235, 360)
    }

    #[test]
    fn thresholds_partition_the_domain() {
        let c = classifier();
        assert_eq!(c.zone_for(0), Zone::Safe);
        assert_eq!(c.zone_for(235), Zone::Safe);
        assert_eq!(c.zone_for(236), Zone::Caution);
        assert_eq!(c.zone_for(360), Zone::Caution);
        assert_eq!(c.zone_for(361), Zone::Critical);
    }

    #[test]
    fn malformed_values_degrade_to_safe() {
        let c = classifier();
        assert_eq!(c.zone_for(-1), Zone::Safe);
        assert_eq!(c.zone_for(i32::MIN), Zone::Safe);
    }

    #[test]
    fn overrides_per_zone() {
        assert_eq!(override_for(Zone::Safe), None);
        assert_eq!(override_for(Zone::Caution), Some(Command::Decelerate));
        assert_eq!(override_for(Zone::Critical), Some(Command::Stop));
    }

    #[test]
    fn only_zone_changes_are_announced() {
        let c = classifier();
        let mut state = SafetyState::new();

        let first = c.classify(0, &mut state);
        assert!(first.changed, "first reading always announces");
        assert!(!c.classify(100, &mut state).changed);

        let caution = c.classify(300, &mut state);
        assert!(caution.changed);
        assert_eq!(caution.override_command, Some(Command::Decelerate));
        assert!(!c.classify(310, &mut state).changed);

        let critical = c.classify(400, &mut state);
        assert!(critical.changed);
        assert_eq!(critical.override_command, Some(Command::Stop));
        assert_eq!(state.zone(), Zone::Critical);
        assert_eq!(state.last_logged_zone(), Some(Zone::Critical));

        assert!(c.classify(10, &mut state).changed);
        assert_eq!(state.zone(), Zone::Safe);
    }

    #[test]
    fn easing_from_critical_to_caution_is_silent() {
        let c = classifier();
        let mut state = SafetyState::new();

        assert!(c.classify(400, &mut state).announced);
        let eased = c.classify(300, &mut state);
        assert!(eased.changed);
        assert!(!eased.announced);
        assert_eq!(eased.override_command, Some(Command::Decelerate));
        assert_eq!(state.last_logged_zone(), Some(Zone::Caution));

        // Stepping up from Safe into Caution is still announced.
        assert!(c.classify(0, &mut state).announced);
        assert!(c.classify(300, &mut state).announced);
    }
}
