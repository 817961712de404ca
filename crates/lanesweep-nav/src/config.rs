//! [`NavConfig`] – immutable calibration and field-layout parameters.
//!
//! Every value has a default matching the reference field (four lanes, 6 cm
//! markers, turn markers 20/30 to the left and 10/40 to the right).  The
//! struct deserializes from the `[navigation]` table of the LaneSweep config
//! file; missing keys fall back to their defaults.

use std::collections::BTreeSet;

use lanesweep_types::SweepError;
use serde::{Deserialize, Serialize};

/// Navigation engine configuration.  Fixed once the engine is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Physical side length of a printed marker in metres.
    pub marker_size_m: f64,
    /// Distance from the camera to the vehicle's front edge in metres.
    pub camera_to_front_m: f64,
    /// A turn fires when a turn marker is at or closer than this distance.
    pub target_distance_m: f64,
    /// Width of one sweep lane in metres.
    pub lane_width_m: f64,
    /// Lateral deviation tolerated before a corrective step, in centimetres.
    pub deviation_limit_cm: f64,
    /// Number of lanes that make up the field.
    pub total_lanes: u32,
    /// Marker ids that trigger a 180° turn to the left.
    pub left_turn_ids: BTreeSet<i32>,
    /// Marker ids that trigger a 180° turn to the right.
    pub right_turn_ids: BTreeSet<i32>,
    /// Perimeter proximity above which the vehicle decelerates.
    pub caution_threshold: i32,
    /// Perimeter proximity above which the vehicle stops.
    pub critical_threshold: i32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            marker_size_m: 0.06,
            camera_to_front_m: 0.19,
            target_distance_m: 0.15,
            lane_width_m: 0.05,
            deviation_limit_cm: 1.0,
            total_lanes: 4,
            left_turn_ids: BTreeSet::from([20, 30]),
            right_turn_ids: BTreeSet::from([10, 40]),
            caution_threshold: 235,
            critical_threshold: 360,
        }
    }
}

impl NavConfig {
    /// Lane width expressed in whole centimetres.
    pub fn lane_width_cm(&self) -> i32 {
        (self.lane_width_m * 100.0).round() as i32
    }

    /// Check the configuration for values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::InvalidConfig`] describing the first problem
    /// found.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.caution_threshold >= self.critical_threshold {
            return Err(SweepError::InvalidConfig(format!(
                "caution_threshold {} must be below critical_threshold {}",
                self.caution_threshold, self.critical_threshold
            )));
        }
        if self.total_lanes == 0 {
            return Err(SweepError::InvalidConfig(
                "total_lanes must be at least 1".to_string(),
            ));
        }
        let positive = [
            ("marker_size_m", self.marker_size_m),
            ("target_distance_m", self.target_distance_m),
            ("lane_width_m", self.lane_width_m),
            ("deviation_limit_cm", self.deviation_limit_cm),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SweepError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if !self.camera_to_front_m.is_finite() || self.camera_to_front_m < 0.0 {
            return Err(SweepError::InvalidConfig(format!(
                "camera_to_front_m must be non-negative, got {}",
                self.camera_to_front_m
            )));
        }
        if let Some(id) = self.left_turn_ids.intersection(&self.right_turn_ids).next() {
            return Err(SweepError::InvalidConfig(format!(
                "marker id {id} is listed as both a left and a right turn marker"
            )));
        }
        Ok(())
    }
}
