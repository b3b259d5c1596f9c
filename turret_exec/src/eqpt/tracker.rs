//! Tracking subsystem interface

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use util::cancel::CancelToken;

use super::target::TrackedTarget;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Geometry of the tracking sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraGeometry {
    /// Full horizontal field of view.
    ///
    /// Units: radians
    pub fov_h_rad: f64,

    /// Maximum range at which targets can be detected.
    ///
    /// Units: meters
    pub max_range_m: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of tracked targets.
///
/// Implementations are shared between the planning thread and the rest of
/// the executable, so all methods take `&self`.
pub trait Tracker: Send + Sync {
    /// Snapshot of the targets seen in the most recent frame.
    ///
    /// Targets keep the timestamp at which they were observed.
    fn targets(&self) -> Vec<TrackedTarget>;

    /// Block until a new frame of tracking data is available, the timeout
    /// elapses, or `cancel` is triggered.
    ///
    /// Returns `true` only if new data arrived.
    fn wait_for_targets(&self, timeout: Duration, cancel: &CancelToken) -> bool;

    /// Project a target to another instant assuming the sensor is static.
    fn project(&self, target: &TrackedTarget, at: Instant) -> TrackedTarget {
        target.project_linear(at)
    }

    fn camera_geometry(&self) -> CameraGeometry;
}
