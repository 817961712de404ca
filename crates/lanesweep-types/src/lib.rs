use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single fiducial marker measurement taken from one camera frame.
///
/// `distance_m` is measured from the vehicle's front edge, not the camera.
/// `lateral_cm` is positive when the marker sits to the right of the optical
/// axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarkerObservation {
    pub id: i32,
    pub distance_m: f64,
    pub lateral_cm: f64,
}

impl MarkerObservation {
    pub fn new(id: i32, distance_m: f64, lateral_cm: f64) -> Self {
        Self {
            id,
            distance_m,
            lateral_cm,
        }
    }
}

/// Camera-frame pose of a marker as produced by an external PnP solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarkerPose {
    pub id: i32,
    /// Translation `[x, y, z]` of the marker centre in metres.
    pub translation_m: [f64; 3],
}

impl MarkerPose {
    /// Convert the pose into a navigation observation.
    ///
    /// The depth axis is shifted by `camera_to_front_m` so distances are
    /// relative to the vehicle's front edge; the horizontal axis becomes the
    /// lateral deviation in centimetres.
    pub fn to_observation(&self, camera_to_front_m: f64) -> MarkerObservation {
        let [x, _, z] = self.translation_m;
        MarkerObservation {
            id: self.id,
            distance_m: z - camera_to_front_m,
            lateral_cm: x * 100.0,
        }
    }
}

/// Everything the perception layer hands the engine for one tick.
///
/// Markers arrive either as ready-made `observations` or as raw camera-frame
/// `poses`; the engine converts poses with its configured camera offset and
/// evaluates them after the observations.
///
/// This is also the record format of replay files (one JSON object per line).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PerceptionFrame {
    #[serde(default)]
    pub observations: Vec<MarkerObservation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub poses: Vec<MarkerPose>,
    /// Distance-to-perimeter proxy; larger means closer. `0` means no
    /// perimeter line is visible.
    #[serde(default)]
    pub perimeter_proximity: i32,
}

/// Discrete drive command sent to the motor controller.
///
/// The serialized form is the single-character wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Command {
    #[serde(rename = "F")]
    Forward,
    #[serde(rename = "L")]
    TurnLeft180,
    #[serde(rename = "R")]
    TurnRight180,
    #[serde(rename = "l")]
    StepLeft,
    #[serde(rename = "r")]
    StepRight,
    #[serde(rename = "S")]
    Stop,
    #[serde(rename = "D")]
    Decelerate,
}

impl Command {
    /// Every command, in wire-table order.
    pub const ALL: [Command; 7] = [
        Command::Forward,
        Command::TurnLeft180,
        Command::TurnRight180,
        Command::StepLeft,
        Command::StepRight,
        Command::Stop,
        Command::Decelerate,
    ];

    /// The single-character code understood by the motor controller firmware.
    pub const fn code(self) -> char {
        match self {
            Command::Forward => 'F',
            Command::TurnLeft180 => 'L',
            Command::TurnRight180 => 'R',
            Command::StepLeft => 'l',
            Command::StepRight => 'r',
            Command::Stop => 'S',
            Command::Decelerate => 'D',
        }
    }

    /// Parse a wire code back into a command.
    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// `true` for the two 180° lane-change turns.
    pub const fn is_turn(self) -> bool {
        matches!(self, Command::TurnLeft180 | Command::TurnRight180)
    }

    /// `true` for the lateral micro-corrections.
    pub const fn is_step(self) -> bool {
        matches!(self, Command::StepLeft | Command::StepRight)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Perimeter-proximity safety classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    #[default]
    Safe,
    Caution,
    Critical,
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Zone::Safe => write!(f, "safe"),
            Zone::Caution => write!(f, "caution"),
            Zone::Critical => write!(f, "critical"),
        }
    }
}

/// Immutable copy of the engine state, published after every tick so other
/// threads can observe navigation without touching the live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationSnapshot {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub lane_index: u32,
    pub total_lanes: u32,
    pub lane_offset_cm: i32,
    pub correcting: bool,
    pub awaiting_unlock: bool,
    pub locked_marker_id: Option<i32>,
    pub zone: Zone,
    pub last_command: Option<Command>,
}

impl NavigationSnapshot {
    /// Snapshot of a freshly constructed engine that has not ticked yet.
    pub fn initial(total_lanes: u32) -> Self {
        Self {
            tick: 0,
            timestamp: Utc::now(),
            lane_index: 0,
            total_lanes,
            lane_offset_cm: 0,
            correcting: false,
            awaiting_unlock: false,
            locked_marker_id: None,
            zone: Zone::Safe,
            last_command: None,
        }
    }

    /// `true` once every configured lane has been swept.
    pub fn coverage_complete(&self) -> bool {
        self.lane_index >= self.total_lanes
    }
}

/// Error type shared by every LaneSweep crate.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum SweepError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Perception Error: {0}")]
    Perception(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Telemetry Error: {0}")]
    Telemetry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_bit_exact() {
        let codes: String = Command::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes, "FLRlrSD");
    }

    #[test]
    fn from_code_rejects_unknown() {
        assert_eq!(Command::from_code('L'), Some(Command::TurnLeft180));
        assert_eq!(Command::from_code('l'), Some(Command::StepLeft));
        assert_eq!(Command::from_code('X'), None);
    }

    #[test]
    fn command_serializes_as_wire_code() {
        let json = serde_json::to_string(&Command::StepRight).unwrap();
        assert_eq!(json, "\"r\"");
        let back: Command = serde_json::from_str("\"D\"").unwrap();
        assert_eq!(back, Command::Decelerate);
    }

    #[test]
    fn turn_and_step_predicates() {
        assert!(Command::TurnLeft180.is_turn());
        assert!(Command::TurnRight180.is_turn());
        assert!(!Command::Forward.is_turn());
        assert!(Command::StepLeft.is_step());
        assert!(!Command::Stop.is_step());
    }

    #[test]
    fn pose_to_observation_offsets_depth_and_scales_lateral() {
        let pose = MarkerPose {
            id: 20,
            translation_m: [0.015, -0.02, 0.34],
        };
        let obs = pose.to_observation(0.19);
        assert_eq!(obs.id, 20);
        assert!((obs.distance_m - 0.15).abs() < 1e-9);
        assert!((obs.lateral_cm - 1.5).abs() < 1e-9);
    }

    #[test]
    fn perception_frame_fields_default_when_missing() {
        let frame: PerceptionFrame = serde_json::from_str("{}").unwrap();
        assert!(frame.observations.is_empty());
        assert!(frame.poses.is_empty());
        assert_eq!(frame.perimeter_proximity, 0);

        let frame: PerceptionFrame = serde_json::from_str(
            r#"{"observations":[{"id":10,"distance_m":0.4,"lateral_cm":-0.3}],"perimeter_proximity":250}"#,
        )
        .unwrap();
        assert_eq!(frame.observations, vec![MarkerObservation::new(10, 0.4, -0.3)]);
        assert_eq!(frame.perimeter_proximity, 250);
    }

    #[test]
    fn initial_snapshot_is_not_complete() {
        let snap = NavigationSnapshot::initial(4);
        assert_eq!(snap.tick, 0);
        assert!(!snap.coverage_complete());
        assert_eq!(snap.zone, Zone::Safe);
        assert_eq!(snap.last_command, None);
    }

    #[test]
    fn sweep_error_display() {
        let err = SweepError::HardwareFault {
            component: "serial".to_string(),
            details: "port closed".to_string(),
        };
        assert!(err.to_string().contains("serial"));
        assert!(SweepError::InvalidConfig("x".into())
            .to_string()
            .contains("Invalid configuration"));
    }
}
