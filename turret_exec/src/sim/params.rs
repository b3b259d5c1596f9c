//! Parameters for the simulated equipment

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::eqpt::{CameraGeometry, TargetId, TargetPosition};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    // ---- TRACKER ----

    /// Time between tracking frames.
    ///
    /// Units: seconds
    pub frame_period_s: f64,

    /// Units: radians
    pub fov_h_rad: f64,

    /// Units: meters
    pub max_range_m: f64,

    /// Position of the sensor relative to the nozzle, in the turret frame
    /// (x right, y up, z forward).
    ///
    /// Units: meters
    pub camera_offset_m: [f64; 3],

    /// Blend factor between the previous velocity estimate and the latest
    /// finite difference.
    pub velocity_smoothing: f64,

    /// Velocity components smaller than these are zeroed.
    pub velocity_dead_zone: TargetPosition,

    // ---- PEOPLE ----
    #[serde(default)]
    pub people: Vec<SimPerson>,

    // ---- YAW STEPPER ----

    /// Units: radians per whole step
    pub yaw_step_size_rad: f64,

    /// Units: hertz
    pub min_step_freq_hz: f64,

    pub available_microsteps: Vec<u8>,

    // ---- RUN ----

    /// How long the executable runs for.
    ///
    /// Units: seconds
    pub run_duration_s: f64,
}

/// A simulated person walking in a straight line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimPerson {
    pub id: TargetId,

    /// Position relative to the nozzle at the start of the simulation, in the
    /// frame of the turret at zero yaw (x right, y up, z forward).
    ///
    /// Units: meters
    pub start_m: [f64; 3],

    /// Units: meters/second
    #[serde(default)]
    pub velocity_ms: [f64; 3],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimParams {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.frame_period_s > 0.0) {
            return Err(format!("frame_period_s must be positive, found {}", self.frame_period_s));
        }
        if !(self.fov_h_rad > 0.0) || !(self.max_range_m > 0.0) {
            return Err("fov_h_rad and max_range_m must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.velocity_smoothing) {
            return Err(format!(
                "velocity_smoothing must be in [0, 1], found {}",
                self.velocity_smoothing
            ));
        }
        if !(self.yaw_step_size_rad > 0.0) || !(self.min_step_freq_hz >= 0.0) {
            return Err("yaw_step_size_rad must be positive and min_step_freq_hz not negative".into());
        }
        if !(self.run_duration_s > 0.0) {
            return Err(format!("run_duration_s must be positive, found {}", self.run_duration_s));
        }

        Ok(())
    }

    pub fn camera_geometry(&self) -> CameraGeometry {
        CameraGeometry {
            fov_h_rad: self.fov_h_rad,
            max_range_m: self.max_range_m,
        }
    }
}
