//! [`NavigationEngine`] – one command per camera frame.
//!
//! The engine owns the [`NavigationState`] and [`SafetyState`] and mutates
//! them once per [`tick`][NavigationEngine::tick].  `tick` never blocks and
//! never fails; it takes `&mut self`, so exactly one control loop drives it.
//! Other threads observe progress through [`NavigationEngine::snapshot`].
//!
//! Per tick:
//!
//! 1. New marker distances are announced (suppressed while correcting).
//! 2. The [`SafetyClassifier`] zones the perimeter proximity.
//! 3. The [`LateralController`] looks for drift beyond the limit.
//! 4. Only when no correction fired, the [`TurnSequencer`] runs.
//! 5. The [`CommandArbiter`] merges the results.

use chrono::Utc;
use lanesweep_types::{
    Command, MarkerObservation, NavigationSnapshot, PerceptionFrame, SweepError,
};
use tracing::{debug, info};

use crate::arbiter::{CommandArbiter, Signals};
use crate::config::NavConfig;
use crate::lateral::LateralController;
use crate::safety::SafetyClassifier;
use crate::state::{NavigationState, SafetyState};
use crate::turn::TurnSequencer;

/// The navigation arbitration engine.
#[derive(Debug)]
pub struct NavigationEngine {
    config: NavConfig,
    safety: SafetyClassifier,
    lateral: LateralController,
    turns: TurnSequencer,
    arbiter: CommandArbiter,
    navigation: NavigationState,
    safety_state: SafetyState,
    ticks: u64,
    last_command: Option<Command>,
}

impl NavigationEngine {
    /// Build an engine in its initial state (lane 0, unlocked, not
    /// correcting) using the standard arbitration table.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::InvalidConfig`] when `config` fails
    /// [`NavConfig::validate`].
    pub fn new(config: NavConfig) -> Result<Self, SweepError> {
        Self::with_arbiter(config, CommandArbiter::standard())
    }

    /// Like [`NavigationEngine::new`] but with a caller-supplied rule table.
    pub fn with_arbiter(config: NavConfig, arbiter: CommandArbiter) -> Result<Self, SweepError> {
        config.validate()?;
        Ok(Self {
            safety: SafetyClassifier::new(config.caution_threshold, config.critical_threshold),
            lateral: LateralController::new(config.deviation_limit_cm),
            turns: TurnSequencer::from_config(&config),
            arbiter,
            navigation: NavigationState::new(),
            safety_state: SafetyState::new(),
            ticks: 0,
            last_command: None,
            config,
        })
    }

    /// Advance the engine by one frame and return the command to send.
    pub fn tick(&mut self, observations: &[MarkerObservation], perimeter_proximity: i32) -> Command {
        self.ticks += 1;
        self.announce_distances(observations);

        let assessment = self.safety.classify(perimeter_proximity, &mut self.safety_state);
        let correction = self.lateral.evaluate(observations, &mut self.navigation);
        let navigation = match correction {
            Some(_) => None,
            None => Some(self.turns.evaluate(observations, &mut self.navigation)),
        };

        let command = self.arbiter.arbitrate(&Signals {
            safety_override: assessment.override_command,
            correction,
            navigation,
        });
        debug!(
            tick = self.ticks,
            zone = %assessment.zone,
            zone_changed = assessment.changed,
            zone_announced = assessment.announced,
            markers = observations.len(),
            command = %command,
            step = command.is_step(),
            "tick"
        );

        self.last_command = Some(command);
        command
    }

    /// [`tick`][NavigationEngine::tick] on a whole perception frame.
    ///
    /// Raw poses are shifted by `camera_to_front_m` and appended after the
    /// frame's ready-made observations.
    pub fn tick_frame(&mut self, frame: &PerceptionFrame) -> Command {
        if frame.poses.is_empty() {
            return self.tick(&frame.observations, frame.perimeter_proximity);
        }
        let offset = self.config.camera_to_front_m;
        let observations: Vec<MarkerObservation> = frame
            .observations
            .iter()
            .copied()
            .chain(frame.poses.iter().map(|pose| pose.to_observation(offset)))
            .collect();
        self.tick(&observations, frame.perimeter_proximity)
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn safety(&self) -> &SafetyState {
        &self.safety_state
    }

    /// Number of ticks processed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Immutable copy of the current state for observers on other threads.
    pub fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            tick: self.ticks,
            timestamp: Utc::now(),
            lane_index: self.navigation.lane_index,
            total_lanes: self.config.total_lanes,
            lane_offset_cm: self.navigation.lane_offset_cm,
            correcting: self.navigation.correcting,
            awaiting_unlock: self.navigation.awaiting_unlock,
            locked_marker_id: self.navigation.locked_marker_id,
            zone: self.safety_state.zone,
            last_command: self.last_command,
        }
    }

    fn announce_distances(&mut self, observations: &[MarkerObservation]) {
        if self.navigation.correcting {
            return;
        }
        for obs in observations {
            let distance_cm = (obs.distance_m * 100.0) as i64;
            if self.navigation.last_logged_distance.get(&obs.id) != Some(&distance_cm) {
                info!(
                    marker_id = obs.id,
                    distance_m = obs.distance_m,
                    lateral_cm = obs.lateral_cm,
                    "marker"
                );
                self.navigation.last_logged_distance.insert(obs.id, distance_cm);
            }
        }
    }
}
