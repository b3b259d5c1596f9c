//! Tracked target data model
//!
//! Targets are expressed in a mixed angular/metric frame centred on the
//! turret: the yaw angle of the target from the sensor centre line, the
//! height of the target above the nozzle, and the horizontal distance to the
//! target.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::ops::{Add, Mul, Sub};
use std::time::Instant;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use util::time::signed_secs_between;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Identity of a target, stable across tracking frames.
pub type TargetId = u32;

/// A position (or rate of change of position) in the turret's mixed frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    /// Angle of the target from the sensor centre line, positive to the right.
    ///
    /// Units: radians (or radians/second for a velocity)
    pub yaw_rad: f64,

    /// Height of the target relative to the nozzle.
    ///
    /// Units: meters (or meters/second for a velocity)
    pub height_m: f64,

    /// Horizontal distance to the target.
    ///
    /// Units: meters (or meters/second for a velocity)
    pub distance_m: f64,
}

/// One detected person at a given instant.
///
/// The velocity is only meaningful relative to `timestamp`, use
/// [`TrackedTarget::project_linear`] (or a motion compensating projector) to
/// express the target at another time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedTarget {
    pub id: TargetId,

    /// Time at which `position` was observed.
    pub timestamp: Instant,

    pub position: TargetPosition,

    /// Rate of change of `position`, smoothed and dead-zoned.
    pub velocity: TargetPosition,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TargetPosition {
    pub fn new(yaw_rad: f64, height_m: f64, distance_m: f64) -> Self {
        Self {
            yaw_rad,
            height_m,
            distance_m,
        }
    }

    /// Zero each component whose magnitude is below the matching component of
    /// `dead_zone`.
    pub fn dead_zoned(self, dead_zone: &TargetPosition) -> Self {
        let dz = |v: f64, lim: f64| if v.abs() < lim { 0.0 } else { v };

        Self {
            yaw_rad: dz(self.yaw_rad, dead_zone.yaw_rad),
            height_m: dz(self.height_m, dead_zone.height_m),
            distance_m: dz(self.distance_m, dead_zone.distance_m),
        }
    }
}

impl Add for TargetPosition {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            yaw_rad: self.yaw_rad + rhs.yaw_rad,
            height_m: self.height_m + rhs.height_m,
            distance_m: self.distance_m + rhs.distance_m,
        }
    }
}

impl Sub for TargetPosition {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            yaw_rad: self.yaw_rad - rhs.yaw_rad,
            height_m: self.height_m - rhs.height_m,
            distance_m: self.distance_m - rhs.distance_m,
        }
    }
}

impl Mul<f64> for TargetPosition {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self {
            yaw_rad: self.yaw_rad * rhs,
            height_m: self.height_m * rhs,
            distance_m: self.distance_m * rhs,
        }
    }
}

impl TrackedTarget {
    /// Build a target from a cartesian point in the sensor frame.
    ///
    /// The sensor frame has x to the right, y up and z forward. The camera
    /// offset is the position of the sensor relative to the nozzle and is
    /// added to the point before conversion. A point with zero depth means
    /// the tracker has lost the user, and `None` is returned.
    ///
    /// Units: meters
    pub fn from_sensor_point(
        id: TargetId,
        timestamp: Instant,
        point_m: &Vector3<f64>,
        camera_offset_m: &Vector3<f64>,
    ) -> Option<Self> {
        if point_m.z == 0.0 {
            return None;
        }

        let p = point_m + camera_offset_m;

        Some(Self {
            id,
            timestamp,
            position: TargetPosition {
                yaw_rad: (p.x / p.z).atan(),
                height_m: p.y,
                distance_m: p.x.hypot(p.z),
            },
            velocity: TargetPosition::default(),
        })
    }

    /// Estimate this target's velocity from a previous observation of the
    /// same target.
    ///
    /// `previous` must already be expressed in this observation's reference
    /// frame (i.e. any rotation of the sensor between the two frames has been
    /// removed from its yaw). The raw finite difference is blended with the
    /// previous velocity using `smoothing` (0 uses the raw difference only, 1
    /// keeps the previous velocity) and then dead-zoned.
    pub fn with_velocity_from(
        mut self,
        previous: &TrackedTarget,
        smoothing: f64,
        dead_zone: &TargetPosition,
    ) -> Self {
        let dt = signed_secs_between(previous.timestamp, self.timestamp);

        if dt <= 0.0 {
            self.velocity = previous.velocity;
            return self;
        }

        let raw = (self.position - previous.position) * (1.0 / dt);
        let smoothing = smoothing.max(0.0).min(1.0);

        self.velocity =
            (previous.velocity * smoothing + raw * (1.0 - smoothing)).dead_zoned(dead_zone);
        self
    }

    /// Linearly project this target to another instant using its velocity.
    ///
    /// This assumes the sensor did not move between the two instants.
    pub fn project_linear(&self, at: Instant) -> Self {
        let dt = signed_secs_between(self.timestamp, at);

        Self {
            timestamp: at,
            position: self.position + self.velocity * dt,
            ..*self
        }
    }

    /// Position of the target `secs` seconds after its timestamp, without
    /// changing the timestamp.
    pub fn position_after(&self, secs: f64) -> TargetPosition {
        self.position + self.velocity * secs
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
