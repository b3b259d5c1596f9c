//! Planning thread

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, error, info, trace, warn};

use crate::{
    eqpt::{TargetId, TrackedTarget, Tracker},
    movement::SingleMovement,
    target_sel::TargetSelector,
    traj_plan::{PlannerError, TrajPlanner},
};

use super::{MotionCtrlError, MotionCtrlParams, Projector, Shared};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of times a replan is retried when the executing movement changes
/// under it.
const MAX_PLAN_ATTEMPTS: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub(super) struct PlannerWorker {
    shared: Arc<Shared>,
    tracker: Arc<dyn Tracker>,
    projector: Box<dyn Projector>,
    selector: TargetSelector,
    planner: TrajPlanner,
    params: MotionCtrlParams,

    /// Target the last submitted plan was aimed at.
    engaged: Option<TargetId>,
}

/// Movements planned from a particular executing movement.
struct Proposal {
    target: TargetId,

    /// Plan advance count when the executing movement was copied.
    advances: u64,

    movements: Vec<SingleMovement>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum ReplanOutcome {
    /// A new plan was spliced in.
    Replanned { target: TargetId, movements: usize },

    /// There was no target to plan for, the search movement was refreshed.
    NoTarget,

    /// Shutdown was requested while planning, nothing was submitted.
    Cancelled,

    /// The executing movement kept changing while planning, nothing was
    /// submitted.
    Stale,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Body of the planning thread.
///
/// Runs until cancelled. Any error cancels the whole controller so the
/// executor stops the turret.
pub(super) fn planner_thread(mut worker: PlannerWorker) -> Result<(), MotionCtrlError> {
    info!("Planner thread started");

    let res = worker.run();

    if let Err(ref e) = res {
        error!("Planner thread failed: {}", e);
        worker.shared.cancel.cancel();
        worker.shared.plan_cv.notify_all();
    }

    info!("Planner thread stopped");

    res
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PlannerWorker {
    pub(super) fn new(
        shared: Arc<Shared>,
        tracker: Arc<dyn Tracker>,
        projector: Box<dyn Projector>,
        selector: TargetSelector,
        planner: TrajPlanner,
        params: MotionCtrlParams,
    ) -> Self {
        Self {
            shared,
            tracker,
            projector,
            selector,
            planner,
            params,
            engaged: None,
        }
    }

    fn run(&mut self) -> Result<(), MotionCtrlError> {
        let timeout = Duration::from_secs_f64(self.params.tracking_timeout_s);

        while !self.shared.cancel.is_cancelled() {
            if self.tracker.wait_for_targets(timeout, &self.shared.cancel) {
                self.replan(Instant::now())?;
            } else if !self.shared.cancel.is_cancelled() {
                trace!("No tracking data within {:?}", timeout);
                self.no_target()?;
            }
        }

        Ok(())
    }

    /// Select a target from the latest tracking data and splice a plan for it
    /// into the movement plan, as if planning at `now`.
    pub(super) fn replan(&mut self, now: Instant) -> Result<ReplanOutcome, MotionCtrlError> {
        let candidates = self
            .tracker
            .targets()
            .iter()
            .map(|t| self.projector.project(t, now))
            .collect::<Result<Vec<TrackedTarget>, _>>()?;

        let target = match self.selector.select_preferring(&candidates, self.engaged) {
            Some(t) => t,
            None => {
                if self.engaged.take().is_some() {
                    debug!("Lost target, {} candidates", candidates.len());
                }
                return self.no_target();
            }
        };

        for attempt in 1..=MAX_PLAN_ATTEMPTS {
            let proposal = match self.propose(&target)? {
                Some(p) => p,
                None => return self.no_target(),
            };

            match self.splice(proposal, now)? {
                ReplanOutcome::Stale => debug!(
                    "Executing movement changed while planning for target {} (attempt {})",
                    target.id, attempt
                ),
                outcome => return Ok(outcome),
            }
        }

        warn!(
            "Could not plan for target {} before the executing movement changed",
            target.id
        );
        Ok(ReplanOutcome::Stale)
    }

    /// Plan for `target` from the movement executing right now.
    ///
    /// Returns `None` if the target can't be reached within the largest
    /// movement model.
    fn propose(&mut self, target: &TrackedTarget) -> Result<Option<Proposal>, MotionCtrlError> {
        let (current, advances) = {
            let plan = self.shared.plan.lock()?;
            (*plan.current(), plan.advances())
        };

        match self
            .planner
            .plan(target, &current, self.params.plan_horizon_periods)
        {
            Ok(movements) => Ok(Some(Proposal {
                target: target.id,
                advances,
                movements,
            })),
            Err(PlannerError::HorizonExhausted { required, max }) => {
                warn!(
                    "Cannot plan for target {}: needs {} periods, limit is {}",
                    target.id, required, max
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the pending movements with a proposal, provided the movement
    /// it was planned from is still executing.
    fn splice(&mut self, proposal: Proposal, now: Instant) -> Result<ReplanOutcome, MotionCtrlError> {
        let movements = proposal.movements.len();

        {
            let mut plan = self.shared.plan.lock()?;

            if self.shared.cancel.is_cancelled() {
                return Ok(ReplanOutcome::Cancelled);
            }

            // The first movement is only reachable from the one it was
            // planned against
            if plan.advances() != proposal.advances {
                return Ok(ReplanOutcome::Stale);
            }

            plan.submit(proposal.movements, self.params.search_speed_rads);

            let retention = Duration::from_secs_f64(self.params.history_retention_s);
            if let Some(before) = now.checked_sub(retention) {
                plan.trim_history(before);
            }
        }
        self.shared.plan_cv.notify_all();

        if self.engaged != Some(proposal.target) {
            info!("Engaging target {}", proposal.target);
        }
        self.engaged = Some(proposal.target);

        trace!(
            "Submitted {} movements for target {}",
            movements,
            proposal.target
        );

        Ok(ReplanOutcome::Replanned {
            target: proposal.target,
            movements,
        })
    }

    fn no_target(&mut self) -> Result<ReplanOutcome, MotionCtrlError> {
        self.shared
            .plan
            .lock()?
            .refresh_search(self.params.search_speed_rads);
        Ok(ReplanOutcome::NoTarget)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
