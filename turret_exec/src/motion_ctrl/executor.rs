//! Execution of the movement plan
//!
//! The executor owns the actuators. Each step either waits for the executing
//! movement to finish (or for a new plan), or advances the plan and commands
//! the next movement. The plan's lock is never held while the actuators are
//! commanded.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::{info, trace, warn};
use util::archive::Archiver;

use crate::{eqpt::Actuators, movement::SingleMovement};

use super::{plan::MovementPlan, MotionCtrlError, Shared};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Advances the movement plan and drives the actuators.
pub struct Executor {
    shared: Arc<Shared>,
    actuators: Actuators,

    /// Completed movements are written here if present.
    archiver: Option<Archiver>,

    /// Longest time a single step will wait.
    poll_period: Duration,

    /// Pitch transition time used for unbounded movements.
    default_transition: Duration,

    /// Plan generation at the last advance, zero before the first.
    seen_generation: u64,

    started: bool,
    stopped: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of a single [`Executor::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The first movement was commanded.
    Started(SingleMovement),

    /// A movement completed and the next one was commanded.
    Advanced {
        completed: SingleMovement,
        current: SingleMovement,
    },

    /// Nothing to do yet.
    Waiting,

    /// Shutdown has been requested.
    Cancelled,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Executor {
    pub(crate) fn new(
        shared: Arc<Shared>,
        actuators: Actuators,
        archiver: Option<Archiver>,
        poll_period: Duration,
        default_transition: Duration,
    ) -> Self {
        Self {
            shared,
            actuators,
            archiver,
            poll_period,
            default_transition,
            seen_generation: 0,
            started: false,
            stopped: false,
        }
    }

    /// Run one iteration of the execution loop.
    ///
    /// Blocks for at most the poll period.
    pub fn step(&mut self) -> Result<StepOutcome, MotionCtrlError> {
        if self.shared.cancel.is_cancelled() {
            return Ok(StepOutcome::Cancelled);
        }

        let mut plan = self.shared.plan.lock()?;

        // The generation isn't marked as seen here, so a plan submitted before
        // the first step is picked up by the next one
        if !self.started {
            self.started = true;
            let current = *plan.current();
            drop(plan);

            self.command(&current);
            return Ok(StepOutcome::Started(current));
        }

        let now = Instant::now();
        if !self.should_advance(&plan, now) {
            let timeout = match plan.current_deadline() {
                Some(d) => d.saturating_duration_since(now).min(self.poll_period),
                None => self.poll_period,
            };

            plan = self.shared.plan_cv.wait_timeout(plan, timeout)?.0;

            if self.shared.cancel.is_cancelled() {
                return Ok(StepOutcome::Cancelled);
            }
            if !self.should_advance(&plan, Instant::now()) {
                return Ok(StepOutcome::Waiting);
            }
        }

        self.seen_generation = plan.generation();
        let completed = match plan.advance(Instant::now()) {
            Some(c) => c,
            None => return Ok(StepOutcome::Waiting),
        };
        let current = *plan.current();
        let epoch = plan.epoch();
        drop(plan);

        trace!(
            "Advanced to movement at {:.3} rad/s for {:?}",
            current.yaw_rate_rads,
            current.duration
        );

        self.command(&current);
        self.archive(&completed, epoch);

        Ok(StepOutcome::Advanced { completed, current })
    }

    /// Step until shutdown is requested, then stop the turret.
    pub fn run(&mut self) -> Result<(), MotionCtrlError> {
        info!("Executor started");

        let res = loop {
            match self.step() {
                Ok(StepOutcome::Cancelled) => break Ok(()),
                Ok(_) => (),
                Err(e) => break Err(e),
            }
        };

        self.stop();
        info!("Executor stopped");

        res
    }

    /// Stop the yaw axis and close the valve.
    ///
    /// Only the first call has any effect.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if let Err(e) = self.actuators.yaw.set_angular_velocity(0.0) {
            warn!("Could not stop the yaw axis: {}", e);
        }
        if let Err(e) = self.actuators.valve.power_off() {
            warn!("Could not close the valve: {}", e);
        }
    }

    fn should_advance(&self, plan: &MovementPlan, now: Instant) -> bool {
        plan.generation() != self.seen_generation
            || plan.current_deadline().map_or(false, |d| now >= d)
    }

    /// Command the actuators for a movement. Errors are logged and the
    /// remaining actuators are still commanded.
    fn command(&mut self, movement: &SingleMovement) {
        if let Err(e) = self
            .actuators
            .yaw
            .set_angular_velocity(movement.yaw_rate_rads)
        {
            warn!("Yaw actuator error: {}", e);
        }

        let transition = movement.duration.unwrap_or(self.default_transition);
        if let Err(e) = self
            .actuators
            .pitch
            .set_target_position(movement.ending_pitch_rad, transition)
        {
            warn!("Pitch actuator error: {}", e);
        }

        let valve_res = if movement.on_target {
            self.actuators.valve.power_on()
        } else {
            self.actuators.valve.power_off()
        };
        if let Err(e) = valve_res {
            warn!("Valve error: {}", e);
        }
    }

    fn archive(&mut self, completed: &SingleMovement, epoch: Instant) {
        if let Some(archiver) = self.archiver.as_mut() {
            if let Err(e) = archiver.serialise(completed.to_record(epoch)) {
                warn!("Could not archive movement: {}", e);
            }
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
