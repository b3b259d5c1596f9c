//! # Equipment interfaces
//!
//! The turret talks to two kinds of equipment: the tracking subsystem, which
//! reports the people it can see, and the actuators (yaw and pitch axes plus
//! the water valve). Both are abstracted behind traits so that the motion
//! controller can run against either real drivers or the simulation.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod actuators;
pub mod stepper;
pub mod target;
pub mod tracker;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use actuators::{Actuators, EqptError, PitchActuator, Valve, YawActuator};
pub use target::{TargetId, TargetPosition, TrackedTarget};
pub use tracker::{CameraGeometry, Tracker};
