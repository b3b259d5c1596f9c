//! Actuator interfaces
//!
//! The yaw axis is driven in velocity mode, the pitch axis in position mode,
//! and the valve is either powered (open) or not.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Yaw axis driver, commanded with a constant angular velocity.
pub trait YawActuator: Send {
    /// Units: radians/second
    fn set_angular_velocity(&mut self, rate_rads: f64) -> Result<(), EqptError>;
}

/// Pitch axis driver, commanded with an end position to reach over a given
/// transition time.
pub trait PitchActuator: Send {
    /// Units: radians
    fn set_target_position(&mut self, angle_rad: f64, transition: Duration)
        -> Result<(), EqptError>;
}

/// Water valve driver.
pub trait Valve: Send {
    fn power_on(&mut self) -> Result<(), EqptError>;

    fn power_off(&mut self) -> Result<(), EqptError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The full set of actuators driven by the motion controller.
pub struct Actuators {
    pub yaw: Box<dyn YawActuator>,
    pub pitch: Box<dyn PitchActuator>,
    pub valve: Box<dyn Valve>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EqptError {
    #[error("Demand of {demand} is outside the allowed range [{min}, {max}]")]
    DemandOutOfRange { demand: f64, min: f64, max: f64 },

    #[error("The equipment's shared state is poisoned")]
    PoisonError,

    #[error("Driver fault: {0}")]
    DriverFault(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl std::fmt::Debug for Actuators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actuators").finish()
    }
}

impl<G> From<std::sync::PoisonError<G>> for EqptError {
    fn from(_: std::sync::PoisonError<G>) -> Self {
        Self::PoisonError
    }
}
