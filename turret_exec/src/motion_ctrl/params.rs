//! Parameters for motion control

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the motion controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionCtrlParams {
    /// Yaw rate used while searching for a target. The direction follows the
    /// last planned movement.
    ///
    /// Units: radians/second
    pub search_speed_rads: f64,

    /// Number of planning periods spliced into the plan on each replan.
    pub plan_horizon_periods: usize,

    /// How long the planning thread waits for new tracking data before
    /// treating the cycle as having no target.
    ///
    /// Units: seconds
    pub tracking_timeout_s: f64,

    /// Maximum time the execution loop waits before rechecking the plan.
    ///
    /// Units: seconds
    pub exec_poll_period_s: f64,

    /// Completed movements older than this are removed from the plan.
    ///
    /// Units: seconds
    pub history_retention_s: f64,

    /// If true targets are projected with the turret's own rotation removed,
    /// otherwise the tracker's linear projection is used.
    #[serde(default = "default_true")]
    pub compensate_rotation: bool,

    pub advance_mode: AdvanceMode,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where the execution loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceMode {
    /// The caller takes the [`Executor`](super::Executor) and steps it.
    Foreground,

    /// The controller runs the executor on its own thread.
    Background,
}

fn default_true() -> bool {
    true
}
