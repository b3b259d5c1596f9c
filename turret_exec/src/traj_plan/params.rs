//! Parameters for the trajectory planner

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the trajectory planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerParams {
    // ---- TIMING ----

    /// Length of one planning period, the duration of every planned
    /// movement.
    ///
    /// Units: seconds
    pub period_s: f64,

    // ---- CAPABILITIES ----

    /// Maximum absolute yaw rate.
    ///
    /// Units: radians/second
    pub max_yaw_rate_rads: f64,

    /// Maximum absolute yaw acceleration.
    ///
    /// Units: radians/second^2
    pub max_yaw_accel_rads2: f64,

    // ---- MODEL SIZING ----

    /// Smallest number of periods the LP model is created with.
    pub min_model_periods: usize,

    /// The model size is always a multiple of this number of periods.
    pub model_size_multiple: usize,

    /// The model is never grown beyond this number of periods.
    pub max_model_periods: usize,

    /// Factor the model size is multiplied by when a solve is infeasible.
    pub growth_factor: f64,

    // ---- ENGAGEMENT ----

    /// A movement is on target if the planned yaw at its end is within this
    /// angle of the required aim.
    ///
    /// Units: radians
    pub on_target_tolerance_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PlannerParams {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.period_s > 0.0) {
            return Err(format!("period_s must be positive, found {}", self.period_s));
        }
        if !(self.max_yaw_rate_rads > 0.0) || !(self.max_yaw_accel_rads2 > 0.0) {
            return Err("max_yaw_rate_rads and max_yaw_accel_rads2 must be positive".into());
        }
        if self.model_size_multiple == 0 {
            return Err("model_size_multiple must be at least 1".into());
        }
        if self.min_model_periods == 0 || self.min_model_periods > self.max_model_periods {
            return Err(format!(
                "Expected 0 < min_model_periods <= max_model_periods, found {} and {}",
                self.min_model_periods, self.max_model_periods
            ));
        }
        if !(self.growth_factor > 1.0) {
            return Err(format!(
                "growth_factor must be greater than 1, found {}",
                self.growth_factor
            ));
        }
        if !(self.on_target_tolerance_rad >= 0.0) {
            return Err("on_target_tolerance_rad must not be negative".into());
        }

        Ok(())
    }
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            period_s: 0.05,
            max_yaw_rate_rads: 2.0,
            max_yaw_accel_rads2: 4.0,
            min_model_periods: 20,
            model_size_multiple: 20,
            max_model_periods: 400,
            growth_factor: 2.0,
            on_target_tolerance_rad: 0.02,
        }
    }
}
