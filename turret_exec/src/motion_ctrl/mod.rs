//! # Motion Control
//!
//! Keeps the turret aimed at the chosen target. Two activities share a single
//! [`MovementPlan`]:
//!
//! - The planning thread waits for tracking data, selects a target, plans the
//!   next movements and splices them into the plan.
//! - The [`Executor`] advances the plan as movements complete (or as soon as a
//!   new plan is submitted) and commands the actuators.
//!
//! The executor can either run on a thread owned by the controller or be taken
//! by the caller and stepped in the foreground, see [`AdvanceMode`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{error, info};
use thiserror::Error;
use util::{
    archive::Archiver,
    cancel::CancelToken,
    params::{load as load_params, LoadError},
};

use crate::{
    aim::BallisticParams,
    eqpt::{Actuators, TrackedTarget, Tracker},
    movement::{MovementRecord, SingleMovement},
    target_sel::{SelectorParams, TargetSelector},
    traj_plan::{PlannerError, PlannerParams, TrajPlanner},
};

use self::worker::{planner_thread, PlannerWorker};

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod executor;
mod params;
pub mod plan;
pub mod projector;
mod worker;

pub use executor::{Executor, StepOutcome};
pub use params::{AdvanceMode, MotionCtrlParams};
pub use plan::MovementPlan;
pub use projector::{dynamic_project, LinearProjector, PlanProjector, Projector};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The motion controller.
pub struct MotionCtrl {
    params: MotionCtrlParams,

    shared: Arc<Shared>,

    /// Source of target projections for [`MotionCtrl::dynamic_project`].
    tracker: Arc<dyn Tracker>,

    planner_jh: Option<JoinHandle<Result<(), MotionCtrlError>>>,

    exec_jh: Option<JoinHandle<Result<(), MotionCtrlError>>>,

    /// Executor waiting to be taken by the caller in foreground mode.
    executor: Option<Executor>,
}

/// State shared between the planning thread, the executor, and the controller.
pub(crate) struct Shared {
    pub plan: Mutex<MovementPlan>,

    /// Notified whenever a new plan is submitted or shutdown is requested.
    pub plan_cv: Condvar,

    pub cancel: CancelToken,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MotionCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Trajectory planning failed: {0}")]
    PlannerError(#[from] PlannerError),

    #[error("The movement plan's lock is poisoned")]
    PoisonError,

    #[error("Could not start the {0} thread: {1}")]
    ThreadStartError(&'static str, std::io::Error),

    #[error("The {0} thread panicked")]
    ThreadPanicked(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionCtrl {
    /// Create the controller from parameter files and start the planning
    /// thread.
    ///
    /// Loads `motion_ctrl.toml`, `target_sel.toml`, `traj_plan.toml` and
    /// `aim.toml`.
    pub fn from_params(
        tracker: Arc<dyn Tracker>,
        actuators: Actuators,
        archiver: Option<Archiver>,
    ) -> Result<Self, MotionCtrlError> {
        let params: MotionCtrlParams = load_params("motion_ctrl.toml")?;
        let selector_params: SelectorParams = load_params("target_sel.toml")?;
        let planner_params: PlannerParams = load_params("traj_plan.toml")?;
        let ballistic: BallisticParams = load_params("aim.toml")?;

        let selector = TargetSelector::new(selector_params, ballistic, tracker.camera_geometry());
        let planner = TrajPlanner::new(planner_params, ballistic)?;

        Self::new(params, selector, planner, tracker, actuators, archiver)
    }

    /// Create the controller and start the planning thread.
    ///
    /// In [`AdvanceMode::Background`] the execution thread is also started,
    /// otherwise the executor must be taken with [`MotionCtrl::take_executor`]
    /// and stepped by the caller.
    pub fn new(
        params: MotionCtrlParams,
        selector: TargetSelector,
        planner: TrajPlanner,
        tracker: Arc<dyn Tracker>,
        actuators: Actuators,
        archiver: Option<Archiver>,
    ) -> Result<Self, MotionCtrlError> {
        validate(&params, planner.params())?;
        selector
            .params()
            .validate()
            .map_err(MotionCtrlError::InvalidParams)?;

        let shared = Arc::new(Shared {
            plan: Mutex::new(MovementPlan::new(Instant::now(), params.search_speed_rads)),
            plan_cv: Condvar::new(),
            cancel: CancelToken::new(),
        });

        let projector: Box<dyn Projector> = if params.compensate_rotation {
            Box::new(PlanProjector::new(shared.clone(), tracker.clone()))
        } else {
            Box::new(LinearProjector::new(tracker.clone()))
        };

        let executor = Executor::new(
            shared.clone(),
            actuators,
            archiver,
            Duration::from_secs_f64(params.exec_poll_period_s),
            planner.period(),
        );

        let worker = PlannerWorker::new(
            shared.clone(),
            tracker.clone(),
            projector,
            selector,
            planner,
            params,
        );

        let planner_jh = thread::Builder::new()
            .name("motion_ctrl::planner".into())
            .spawn(move || planner_thread(worker))
            .map_err(|e| MotionCtrlError::ThreadStartError("planner", e))?;

        let mut ctrl = Self {
            params,
            shared,
            tracker,
            planner_jh: Some(planner_jh),
            exec_jh: None,
            executor: None,
        };

        match params.advance_mode {
            AdvanceMode::Foreground => ctrl.executor = Some(executor),
            AdvanceMode::Background => {
                let exec_jh = thread::Builder::new()
                    .name("motion_ctrl::exec".into())
                    .spawn(move || {
                        let mut executor = executor;
                        executor.run()
                    })
                    .map_err(|e| MotionCtrlError::ThreadStartError("exec", e))?;
                ctrl.exec_jh = Some(exec_jh);
            }
        }

        info!(
            "MotionCtrl started, advance mode: {:?}, rotation compensation: {}",
            params.advance_mode, params.compensate_rotation
        );

        Ok(ctrl)
    }

    pub fn params(&self) -> &MotionCtrlParams {
        &self.params
    }

    /// Take the executor so it can be stepped in the foreground.
    ///
    /// Returns `None` in background mode or if the executor was already
    /// taken.
    pub fn take_executor(&mut self) -> Option<Executor> {
        self.executor.take()
    }

    /// The movement currently being executed.
    pub fn current_movement(&self) -> Result<SingleMovement, MotionCtrlError> {
        Ok(*self.shared.plan.lock()?.current())
    }

    /// Number of plans submitted so far.
    pub fn plan_generation(&self) -> Result<u64, MotionCtrlError> {
        Ok(self.shared.plan.lock()?.generation())
    }

    /// Serialisable snapshot of the whole movement plan.
    pub fn plan_records(&self) -> Result<Vec<MovementRecord>, MotionCtrlError> {
        Ok(self.shared.plan.lock()?.records())
    }

    /// Project a target to `at` taking the turret's own motion into account.
    pub fn dynamic_project(
        &self,
        target: &TrackedTarget,
        at: Instant,
    ) -> Result<TrackedTarget, MotionCtrlError> {
        Ok(dynamic_project(
            &*self.shared.plan.lock()?,
            &*self.tracker,
            target,
            at,
        ))
    }

    /// True until shutdown is requested or one of the threads fails.
    pub fn is_running(&self) -> bool {
        !self.shared.cancel.is_cancelled()
    }

    /// Stop both threads and wait for them to exit.
    ///
    /// Calling this more than once is harmless.
    pub fn shutdown(&mut self) -> Result<(), MotionCtrlError> {
        self.shared.cancel.cancel();
        self.shared.plan_cv.notify_all();

        let planner_res = join("planner", self.planner_jh.take());
        let exec_res = join("exec", self.exec_jh.take());

        if let Some(executor) = self.executor.as_mut() {
            executor.stop();
        }

        planner_res.and(exec_res)
    }
}

impl Drop for MotionCtrl {
    fn drop(&mut self) {
        if self.planner_jh.is_some() || self.exec_jh.is_some() {
            if let Err(e) = self.shutdown() {
                error!("Error shutting down MotionCtrl: {}", e);
            }
        }
    }
}

impl<G> From<PoisonError<G>> for MotionCtrlError {
    fn from(_: PoisonError<G>) -> Self {
        Self::PoisonError
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn validate(params: &MotionCtrlParams, planner: &PlannerParams) -> Result<(), MotionCtrlError> {
    let invalid = |s: String| Err(MotionCtrlError::InvalidParams(s));

    if !(params.search_speed_rads >= 0.0) || params.search_speed_rads > planner.max_yaw_rate_rads {
        return invalid(format!(
            "search_speed_rads must be in [0, {}], found {}",
            planner.max_yaw_rate_rads, params.search_speed_rads
        ));
    }
    if params.plan_horizon_periods == 0 || params.plan_horizon_periods > planner.max_model_periods
    {
        return invalid(format!(
            "plan_horizon_periods must be in [1, {}], found {}",
            planner.max_model_periods, params.plan_horizon_periods
        ));
    }
    if !(params.tracking_timeout_s > 0.0)
        || !(params.exec_poll_period_s > 0.0)
        || !(params.history_retention_s > 0.0)
    {
        return invalid("Timeouts, poll period and history retention must be positive".into());
    }
    // Projection walks history back to the oldest observation it may be given
    if params.history_retention_s < params.tracking_timeout_s {
        return invalid(format!(
            "history_retention_s ({}) must be at least tracking_timeout_s ({})",
            params.history_retention_s, params.tracking_timeout_s
        ));
    }

    Ok(())
}

/// Join a thread, logging any error it exited with.
fn join(
    name: &'static str,
    jh: Option<JoinHandle<Result<(), MotionCtrlError>>>,
) -> Result<(), MotionCtrlError> {
    match jh.map(JoinHandle::join) {
        None => Ok(()),
        Some(Ok(Ok(()))) => Ok(()),
        Some(Ok(Err(e))) => {
            error!("The {} thread exited with an error: {}", name, e);
            Err(e)
        }
        Some(Err(_)) => Err(MotionCtrlError::ThreadPanicked(name)),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{eqpt::CameraGeometry, sim::SimTurret};

    struct EmptyTracker;

    impl Tracker for EmptyTracker {
        fn targets(&self) -> Vec<TrackedTarget> {
            Vec::new()
        }

        fn wait_for_targets(&self, _timeout: Duration, _cancel: &CancelToken) -> bool {
            false
        }

        fn camera_geometry(&self) -> CameraGeometry {
            CameraGeometry {
                fov_h_rad: 1.0,
                max_range_m: 10.0,
            }
        }
    }

    fn params() -> MotionCtrlParams {
        MotionCtrlParams {
            search_speed_rads: 0.3,
            plan_horizon_periods: 20,
            tracking_timeout_s: 0.2,
            exec_poll_period_s: 0.01,
            history_retention_s: 5.0,
            compensate_rotation: true,
            advance_mode: AdvanceMode::Foreground,
        }
    }

    #[test]
    fn test_validate() {
        let planner = PlannerParams::default();
        assert!(validate(&params(), &planner).is_ok());

        let bad = [
            MotionCtrlParams {
                search_speed_rads: 3.0,
                ..params()
            },
            MotionCtrlParams {
                plan_horizon_periods: 0,
                ..params()
            },
            MotionCtrlParams {
                exec_poll_period_s: 0.0,
                ..params()
            },
            MotionCtrlParams {
                history_retention_s: 0.1,
                ..params()
            },
        ];

        for p in bad.iter() {
            match validate(p, &planner) {
                Err(MotionCtrlError::InvalidParams(_)) => (),
                r => panic!("Expected invalid params for {:?}, got {:?}", p, r),
            }
        }
    }

    #[test]
    fn test_from_params_missing_files() {
        // Only test in this binary that touches the software root
        let root = std::env::temp_dir().join(format!("turret_no_params_{}", std::process::id()));
        std::env::set_var(util::host::SW_ROOT_ENV_VAR, &root);

        let turret = SimTurret::default();
        let tracker: Arc<dyn Tracker> = Arc::new(EmptyTracker);

        match MotionCtrl::from_params(tracker, turret.actuators(), None) {
            Err(MotionCtrlError::ParamLoadError(_)) => (),
            Err(e) => panic!("Expected a parameter load error, got {}", e),
            Ok(_) => panic!("Expected a parameter load error, got a running controller"),
        }
    }
}
