//! # Ballistic Solver
//!
//! Decides whether a jet of water launched now can intercept a moving target,
//! and if so in which direction the nozzle must point.
//!
//! The water is modelled with constant gravity `g` and a constant horizontal
//! drag deceleration `k`. With target height `y`, distance `z`, their rates
//! `vy` and `vz`, launch speed `V` and time of flight `t` the jet hits the
//! target when
//!
//! ```text
//! V cos(p) t = z + vz t + k t^2 / 2
//! V sin(p) t = y + vy t + g t^2 / 2
//! ```
//!
//! Squaring and summing eliminates the pitch `p` and leaves a quartic in `t`,
//! whose earliest positive real root is the time of flight.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use std::f64::consts::FRAC_PI_4;

use util::maths::clamp;

use crate::eqpt::{TargetPosition, TrackedTarget};

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub mod roots;

pub use params::BallisticParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The direction the nozzle must point to hit a target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AimSolution {
    /// Units: radians
    pub yaw_rad: f64,

    /// Units: radians
    pub pitch_rad: f64,

    /// If true the target can't be hit, in which case the yaw is the
    /// target's current bearing and the pitch is 45 degrees.
    pub unreachable: bool,

    /// Time between launch and interception, if reachable.
    ///
    /// Units: seconds
    pub time_of_flight_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the aim needed to hit a target at `position` moving with
/// `velocity`.
pub fn solve(
    position: &TargetPosition,
    velocity: &TargetPosition,
    params: &BallisticParams,
) -> AimSolution {
    let y = position.height_m;
    let z = position.distance_m;

    // Exactly at the nozzle
    if y == 0.0 && z == 0.0 {
        return AimSolution {
            yaw_rad: position.yaw_rad,
            pitch_rad: 0.0,
            unreachable: false,
            time_of_flight_s: Some(0.0),
        };
    }

    let vy = velocity.height_m;
    let vz = velocity.distance_m;
    let v = params.launch_speed_ms;
    let g = params.gravity_ms2;
    let k = params.drag_decel_ms2;

    let roots = roots::solve_quartic(
        (g * g + k * k) / 4.0,
        g * vy + k * vz,
        g * y + vy * vy + k * z + vz * vz - v * v,
        2.0 * (y * vy + z * vz),
        y * y + z * z,
    );

    match roots::earliest_positive_real_root(&roots) {
        Some(t) => AimSolution {
            yaw_rad: position.yaw_rad + velocity.yaw_rad * t,
            pitch_rad: clamp((y + vy * t + g * t * t / 2.0) / (v * t), -1.0, 1.0).asin(),
            unreachable: false,
            time_of_flight_s: Some(t),
        },
        None => unreachable_aim(position),
    }
}

/// Compute the aim needed to hit a tracked target, as observed at its own
/// timestamp.
pub fn solve_target(target: &TrackedTarget, params: &BallisticParams) -> AimSolution {
    solve(&target.position, &target.velocity, params)
}

/// The aim reported for a target which can't be hit.
pub fn unreachable_aim(position: &TargetPosition) -> AimSolution {
    AimSolution {
        yaw_rad: position.yaw_rad,
        pitch_rad: FRAC_PI_4,
        unreachable: true,
        time_of_flight_s: None,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
