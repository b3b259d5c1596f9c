//! # Simulated Equipment
//!
//! A simulated tracker producing people walking in straight lines, and
//! simulated actuators which record their demands and integrate the yaw of the
//! turret. Together they let the motion controller run without hardware.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod actuators;
mod params;
mod tracker;

pub use actuators::{SimTurret, StepperSim, TurretSnapshot};
pub use params::{SimParams, SimPerson};
pub use tracker::SimTracker;
