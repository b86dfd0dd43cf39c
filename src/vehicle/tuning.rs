//! Vehicle handling constants, loadable from TOML.
//!
//! Distances are world pixels, times are seconds, angles are radians.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Handling model parameters. Missing TOML keys keep their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    /// Steering lock either side
    pub max_steering_angle: f32,
    /// Steering angle change per second under input
    pub steering_rate: f32,
    /// Steering angle change per second back toward centre
    pub steering_return_rate: f32,
    /// `k` in the `speed^-k` steering damping
    pub steering_damping_exponent: f32,
    /// Axle distance used for the yaw increment
    pub wheelbase: f32,
    /// Forward throttle, px/s²
    pub acceleration: f32,
    /// Reverse throttle, px/s²
    pub reverse_acceleration: f32,
    /// Constant speed loss, px/s²
    pub rolling_resistance: f32,
    /// Speed-proportional loss, 1/s
    pub drag: f32,
    /// Extra loss at 100% off track, px/s²
    pub off_track_resistance: f32,
    /// Off-track loss only applies above this speed
    pub off_track_min_speed: f32,
    /// `|steer * speed|` below this never drifts
    pub drift_threshold: f32,
    /// Scale inside the square-root drift response
    pub drift_scale: f32,
    /// Upper bound of the drift multiplier
    pub max_drift: f32,
    /// Drift multiplier above which tire marks and skid audio trigger
    pub drift_fx_threshold: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            max_steering_angle: 0.6,
            steering_rate: 3.0,
            steering_return_rate: 6.0,
            steering_damping_exponent: 0.03,
            wheelbase: 24.0,
            acceleration: 300.0,
            reverse_acceleration: 150.0,
            rolling_resistance: 40.0,
            drag: 0.6,
            off_track_resistance: 600.0,
            off_track_min_speed: 20.0,
            drift_threshold: 80.0,
            drift_scale: 0.002,
            max_drift: 0.85,
            drift_fx_threshold: 0.3,
        }
    }
}

impl VehicleTuning {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}
