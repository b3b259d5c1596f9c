//! # Trajectory Planner
//!
//! Converts a target into a sequence of constant-rate yaw movements which
//! converge on the target's aim angle while respecting the yaw axis' rate and
//! acceleration limits.
//!
//! Each plan is computed by:
//!
//! 1. Projecting the target forward one period at a time and running the
//!    ballistic solver at each period boundary, giving the aim yaw required
//!    at every boundary and so the rate which would track it exactly.
//! 2. Loading these into the [`MovementModel`] LP and solving it.
//! 3. Emitting one [`SingleMovement`] per period up to the requested horizon,
//!    stopping early at the first period whose aim is unreachable.
//!
//! The model is sized from the requested horizon and a bang-bang estimate of
//! the time needed to turn onto the target. If the solve is infeasible the
//! model is grown geometrically, up to `max_model_periods`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

use log::{debug, trace};
use thiserror::Error;

use util::maths::{clamp, round_up_to_multiple};

use crate::{
    aim::{self, roots, AimSolution, BallisticParams},
    eqpt::TrackedTarget,
    movement::SingleMovement,
};

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod model;
mod params;

pub use model::{ModelError, MovementModel};
pub use params::PlannerParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The trajectory planner.
///
/// Owns the cached movement model, so must only be used from one thread.
#[derive(Debug)]
pub struct TrajPlanner {
    params: PlannerParams,
    ballistic: BallisticParams,
    model: MovementModel,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Whether the cached model can be reused for a required number of periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSizing {
    /// The current model is large enough.
    Reuse,

    /// Replace the model with one of the given number of periods.
    Grow(usize),

    /// The required size is above the maximum model size.
    Exhausted,
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Invalid planner parameters: {0}")]
    InvalidParams(String),

    #[error(
        "No feasible plan within the maximum horizon ({required} periods \
         required, maximum is {max})"
    )]
    HorizonExhausted { required: usize, max: usize },

    #[error("Movement model error: {0}")]
    ModelError(ModelError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Decide whether a model of `capacity` periods can be reused when
/// `required` periods are needed.
///
/// Models only ever grow, and grown models are rounded up to a multiple of
/// `model_size_multiple` periods. A requirement above `max_model_periods`
/// still gets a model of exactly the maximum size before giving up.
pub fn decide_model_sizing(
    capacity: usize,
    required: usize,
    params: &PlannerParams,
) -> ModelSizing {
    if capacity >= required && capacity > 0 {
        return ModelSizing::Reuse;
    }

    if required > params.max_model_periods {
        return if capacity < params.max_model_periods {
            ModelSizing::Grow(params.max_model_periods)
        } else {
            ModelSizing::Exhausted
        };
    }

    let size = round_up_to_multiple(
        required.max(params.min_model_periods),
        params.model_size_multiple,
    )
    .min(params.max_model_periods);

    ModelSizing::Grow(size)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajPlanner {
    /// Create a new planner with a model of the minimum size.
    pub fn new(params: PlannerParams, ballistic: BallisticParams) -> Result<Self, PlannerError> {
        params.validate().map_err(PlannerError::InvalidParams)?;
        ballistic.validate().map_err(PlannerError::InvalidParams)?;

        let initial = match decide_model_sizing(0, params.min_model_periods, &params) {
            ModelSizing::Grow(n) => n,
            _ => params.min_model_periods,
        };

        Ok(Self {
            params,
            ballistic,
            model: MovementModel::new(initial, &params),
        })
    }

    pub fn params(&self) -> &PlannerParams {
        &self.params
    }

    pub fn ballistic_params(&self) -> &BallisticParams {
        &self.ballistic
    }

    /// Number of periods in the cached model.
    pub fn model_capacity(&self) -> usize {
        self.model.periods()
    }

    /// Duration of one planned movement.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.params.period_s)
    }

    /// Plan up to `horizon` movements towards `target`.
    ///
    /// The target must already be expressed at the instant the plan will
    /// start from, and `current` is the movement executing at that instant.
    pub fn plan(
        &mut self,
        target: &TrackedTarget,
        current: &SingleMovement,
        horizon: usize,
    ) -> Result<Vec<SingleMovement>, PlannerError> {
        if horizon == 0 {
            return Ok(Vec::new());
        }

        let estimate = self.min_periods_estimate(target, current.yaw_rate_rads);
        let mut required = horizon.max(estimate);

        trace!(
            "Planning for target {}: horizon {}, turn estimate {} periods",
            target.id,
            horizon,
            estimate
        );

        loop {
            match decide_model_sizing(self.model.periods(), required, &self.params) {
                ModelSizing::Reuse => (),
                ModelSizing::Grow(n) => {
                    debug!("Growing movement model from {} to {} periods", self.model.periods(), n);
                    self.model = MovementModel::new(n, &self.params);
                }
                ModelSizing::Exhausted => {
                    return Err(PlannerError::HorizonExhausted {
                        required,
                        max: self.params.max_model_periods,
                    })
                }
            }

            let periods = self.model.periods();
            let aims = self.period_aims(target, periods);
            let rates: Vec<f64> = aims
                .windows(2)
                .map(|w| (w[1].yaw_rad - w[0].yaw_rad) / self.params.period_s)
                .collect();

            self.model
                .specialise(current.yaw_rate_rads, &rates, aims[periods].yaw_rad)
                .map_err(PlannerError::ModelError)?;

            match self.model.solve() {
                Ok(x) => return Ok(self.emit(&x, &aims, horizon)),
                Err(ModelError::Infeasible) => {
                    required = ((periods as f64) * self.params.growth_factor).ceil() as usize;
                    debug!(
                        "Movement model infeasible with {} periods, requiring {}",
                        periods, required
                    );
                }
                Err(e) => return Err(PlannerError::ModelError(e)),
            }
        }
    }

    /// Aim solutions at each of the `periods + 1` period boundaries.
    fn period_aims(&self, target: &TrackedTarget, periods: usize) -> Vec<AimSolution> {
        (0..=periods)
            .map(|i| {
                let pos = target.position_after(i as f64 * self.params.period_s);
                aim::solve(&pos, &target.velocity, &self.ballistic)
            })
            .collect()
    }

    /// Lower bound on the number of periods needed to turn onto the target
    /// from `current_rate_rads`, accelerating flat out and ignoring the rate
    /// limit and target motion.
    fn min_periods_estimate(&self, target: &TrackedTarget, current_rate_rads: f64) -> usize {
        let bearing = target.position.yaw_rad;
        let (turn, rate) = if bearing >= 0.0 {
            (bearing, current_rate_rads)
        } else {
            (-bearing, -current_rate_rads)
        };

        let roots = roots::solve_quadratic(0.5 * self.params.max_yaw_accel_rads2, rate, -turn);

        match roots::earliest_positive_real_root(&roots) {
            Some(t) if t.is_finite() => (t / self.params.period_s).ceil() as usize,
            _ => 0,
        }
    }

    /// Build the output movements from a model solution.
    fn emit(&self, x: &[f64], aims: &[AimSolution], horizon: usize) -> Vec<SingleMovement> {
        let period = self.period();
        let vmax = self.params.max_yaw_rate_rads;
        let mut yaw = 0.0;
        let mut movements = Vec::with_capacity(horizon);

        for (i, &rate) in x.iter().enumerate().take(horizon) {
            let aim = &aims[i + 1];
            if aim.unreachable {
                break;
            }

            let rate = clamp(rate, -vmax, vmax);
            yaw += rate * self.params.period_s;

            movements.push(SingleMovement::planned(
                period,
                rate,
                aim.pitch_rad,
                (yaw - aim.yaw_rad).abs() <= self.params.on_target_tolerance_rad,
            ));
        }

        movements
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::TargetPosition;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::time::Instant;

    fn ballistic() -> BallisticParams {
        BallisticParams {
            launch_speed_ms: 10.0,
            drag_decel_ms2: 0.0,
            gravity_ms2: 9.81,
        }
    }

    fn target(position: TargetPosition, velocity: TargetPosition) -> TrackedTarget {
        TrackedTarget {
            id: 0,
            timestamp: Instant::now(),
            position,
            velocity,
        }
    }

    fn check_limits(plan: &[SingleMovement], current_rate: f64, p: &PlannerParams) {
        let step = p.max_yaw_accel_rads2 * p.period_s + 1e-7;

        if let Some(first) = plan.first() {
            assert!((first.yaw_rate_rads - current_rate).abs() <= step);
        }
        for pair in plan.windows(2) {
            assert!((pair[1].yaw_rate_rads - pair[0].yaw_rate_rads).abs() <= step);
        }
        for m in plan {
            assert!(m.yaw_rate_rads.abs() <= p.max_yaw_rate_rads + 1e-7);
            assert!(m.start.is_none());
            assert_eq!(m.duration, Some(Duration::from_secs_f64(p.period_s)));
        }
    }

    #[test]
    fn test_model_sizing() {
        let p = PlannerParams {
            min_model_periods: 20,
            model_size_multiple: 20,
            max_model_periods: 100,
            ..PlannerParams::default()
        };

        assert_eq!(decide_model_sizing(0, 5, &p), ModelSizing::Grow(20));
        assert_eq!(decide_model_sizing(20, 5, &p), ModelSizing::Reuse);
        assert_eq!(decide_model_sizing(20, 20, &p), ModelSizing::Reuse);
        assert_eq!(decide_model_sizing(20, 21, &p), ModelSizing::Grow(40));
        assert_eq!(decide_model_sizing(40, 95, &p), ModelSizing::Grow(100));
        assert_eq!(decide_model_sizing(100, 101, &p), ModelSizing::Exhausted);

        // Overshooting the maximum tries the largest model first
        assert_eq!(decide_model_sizing(80, 160, &p), ModelSizing::Grow(100));
        assert_eq!(decide_model_sizing(0, 500, &p), ModelSizing::Grow(100));

        // Never shrinks
        assert_eq!(decide_model_sizing(80, 30, &p), ModelSizing::Reuse);
    }

    #[test]
    fn test_invalid_params() {
        let p = PlannerParams {
            period_s: 0.0,
            ..PlannerParams::default()
        };
        assert!(matches!(
            TrajPlanner::new(p, ballistic()),
            Err(PlannerError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_still_target_ahead() {
        let p = PlannerParams::default();
        let mut planner = TrajPlanner::new(p, ballistic()).unwrap();
        let t = target(TargetPosition::new(0.0, 0.0, 3.0), TargetPosition::default());

        let plan = planner.plan(&t, &SingleMovement::search(0.0), 10).unwrap();

        assert_eq!(plan.len(), 10);
        for m in plan.iter() {
            assert!(m.yaw_rate_rads.abs() < 1e-6);
            assert!(m.on_target);
            assert!(m.ending_pitch_rad > 0.0);
        }
    }

    #[test]
    fn test_horizon_grows_model() {
        // Tiny acceleration and a big turn need far more than 5 periods
        let p = PlannerParams {
            period_s: 0.05,
            max_yaw_rate_rads: 2.0,
            max_yaw_accel_rads2: 0.5,
            ..PlannerParams::default()
        };
        let mut planner = TrajPlanner::new(p, ballistic()).unwrap();
        let t = target(TargetPosition::new(0.9, 0.0, 3.0), TargetPosition::default());

        let plan = planner.plan(&t, &SingleMovement::search(0.0), 5).unwrap();

        assert_eq!(plan.len(), 5);
        assert!(planner.model_capacity() > 5);
        assert!(planner.model_capacity() >= 40);
        check_limits(&plan, 0.0, &p);

        // Still accelerating towards the target, so not on target yet
        assert!(plan.iter().all(|m| m.yaw_rate_rads > 0.0 && !m.on_target));
    }

    #[test]
    fn test_infeasible_solve_grows_model() {
        // The turn estimate ignores the rate limit, so the first solves fail
        let p = PlannerParams {
            period_s: 0.1,
            max_yaw_rate_rads: 0.2,
            max_yaw_accel_rads2: 10.0,
            ..PlannerParams::default()
        };
        let mut planner = TrajPlanner::new(p, ballistic()).unwrap();
        assert_eq!(planner.model_capacity(), 20);

        let t = target(TargetPosition::new(0.9, 0.0, 3.0), TargetPosition::default());
        let plan = planner.plan(&t, &SingleMovement::search(0.0), 10).unwrap();

        assert_eq!(plan.len(), 10);
        assert_eq!(planner.model_capacity(), 80);
        check_limits(&plan, 0.0, &p);

        // The grown model is reused for smaller problems
        let t = target(TargetPosition::new(0.1, 0.0, 3.0), TargetPosition::default());
        planner.plan(&t, &SingleMovement::search(0.0), 10).unwrap();
        assert_eq!(planner.model_capacity(), 80);
    }

    #[test]
    fn test_growth_tries_max_model() {
        // 90 periods at the rate limit reach the target, growth goes
        // 20 -> 40 -> 80 and then overshoots the maximum
        let p = PlannerParams {
            period_s: 0.1,
            max_yaw_rate_rads: 0.1,
            max_yaw_accel_rads2: 10.0,
            max_model_periods: 100,
            ..PlannerParams::default()
        };
        let mut planner = TrajPlanner::new(p, ballistic()).unwrap();
        let t = target(TargetPosition::new(0.9, 0.0, 3.0), TargetPosition::default());

        let plan = planner.plan(&t, &SingleMovement::search(0.0), 10).unwrap();

        assert_eq!(planner.model_capacity(), 100);
        assert_eq!(plan.len(), 10);
        check_limits(&plan, 0.0, &p);
    }

    #[test]
    fn test_horizon_exhausted() {
        let p = PlannerParams {
            period_s: 0.1,
            max_yaw_rate_rads: 0.01,
            max_model_periods: 100,
            ..PlannerParams::default()
        };
        let mut planner = TrajPlanner::new(p, ballistic()).unwrap();
        let t = target(TargetPosition::new(0.9, 0.0, 3.0), TargetPosition::default());

        assert!(matches!(
            planner.plan(&t, &SingleMovement::search(0.0), 10),
            Err(PlannerError::HorizonExhausted { max: 100, .. })
        ));
    }

    #[test]
    fn test_truncates_at_unreachable() {
        let p = PlannerParams::default();
        let mut planner = TrajPlanner::new(p, ballistic()).unwrap();

        // Walking out of range
        let t = target(TargetPosition::new(0.0, 0.0, 8.0), TargetPosition::new(0.0, 0.0, 1.0));
        let plan = planner.plan(&t, &SingleMovement::search(0.0), 20).unwrap();

        assert!(!plan.is_empty() && plan.len() < 20);
        let n = plan.len();
        for i in 1..=n {
            assert!(!aim::solve(&t.position_after(i as f64 * p.period_s), &t.velocity, &ballistic()).unreachable);
        }
        assert!(aim::solve(&t.position_after((n + 1) as f64 * p.period_s), &t.velocity, &ballistic()).unreachable);
    }

    #[test]
    fn test_random_targets_respect_limits() {
        let mut rng = StdRng::seed_from_u64(99);
        let p = PlannerParams::default();
        let mut planner = TrajPlanner::new(p, ballistic()).unwrap();

        for _ in 0..40 {
            let t = target(
                TargetPosition::new(
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.5..1.0),
                    rng.gen_range(1.0..7.0),
                ),
                TargetPosition::new(
                    rng.gen_range(-0.3..0.3),
                    0.0,
                    rng.gen_range(-0.5..0.5),
                ),
            );
            let current_rate = rng.gen_range(-1.0..1.0);
            let horizon = rng.gen_range(1..30);

            match planner.plan(&t, &SingleMovement::search(current_rate), horizon) {
                Ok(plan) => {
                    assert!(plan.len() <= horizon);
                    check_limits(&plan, current_rate, &p);
                }
                Err(PlannerError::HorizonExhausted { .. }) => (),
                Err(e) => panic!("Unexpected planner error: {}", e),
            }
        }
    }
}
