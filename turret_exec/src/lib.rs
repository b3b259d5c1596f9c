//! # Turret Library
//!
//! Aiming, target selection, trajectory planning and motion control for the
//! self aiming water turret.
//!
//! Data flows from the tracker through target selection and the ballistic
//! solver into the trajectory planner, whose output is spliced into the live
//! movement plan owned by the motion controller and executed against the
//! actuators.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod aim;
pub mod eqpt;
pub mod motion_ctrl;
pub mod movement;
pub mod sim;
pub mod target_sel;
pub mod traj_plan;
