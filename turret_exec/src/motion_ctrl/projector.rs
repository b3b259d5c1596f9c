//! Projection of tracked targets to other instants
//!
//! Both projectors start from the tracker's own projection, so a tracker with
//! a better motion model than constant velocity is used as is.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{sync::Arc, time::Instant};

use crate::eqpt::{TrackedTarget, Tracker};

use super::{plan::MovementPlan, MotionCtrlError, Shared};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Expresses a target, observed at its timestamp, at another instant.
pub trait Projector: Send + Sync {
    fn project(&self, target: &TrackedTarget, at: Instant) -> Result<TrackedTarget, MotionCtrlError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Projects targets with the tracker's projection only, assuming the turret
/// didn't turn.
#[derive(Clone)]
pub struct LinearProjector {
    tracker: Arc<dyn Tracker>,
}

/// Projects targets with the turret's own yaw motion, taken from the live
/// movement plan, removed.
pub struct PlanProjector {
    shared: Arc<Shared>,
    tracker: Arc<dyn Tracker>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LinearProjector {
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self { tracker }
    }
}

impl Projector for LinearProjector {
    fn project(&self, target: &TrackedTarget, at: Instant) -> Result<TrackedTarget, MotionCtrlError> {
        Ok(self.tracker.project(target, at))
    }
}

impl PlanProjector {
    pub(crate) fn new(shared: Arc<Shared>, tracker: Arc<dyn Tracker>) -> Self {
        Self { shared, tracker }
    }
}

impl Projector for PlanProjector {
    fn project(&self, target: &TrackedTarget, at: Instant) -> Result<TrackedTarget, MotionCtrlError> {
        let plan = self.shared.plan.lock()?;
        Ok(dynamic_project(&plan, &*self.tracker, target, at))
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Project `target` to `at` with the tracker, then remove the yaw the turret
/// turns through between the target's timestamp and `at`.
///
/// Projecting forward subtracts the turret's yaw (the target appears to move
/// against the rotation), projecting backward adds it.
pub fn dynamic_project(
    plan: &MovementPlan,
    tracker: &dyn Tracker,
    target: &TrackedTarget,
    at: Instant,
) -> TrackedTarget {
    let mut projected = tracker.project(target, at);

    if at >= target.timestamp {
        projected.position.yaw_rad -= plan.yaw_travelled(target.timestamp, at);
    } else {
        projected.position.yaw_rad += plan.yaw_travelled(at, target.timestamp);
    }

    projected
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
