//! Linear programming model of future yaw movements
//!
//! The model has one signed yaw rate `x[i]` per planning period, plus a
//! slack `t[i] >= |x[i] - r[i]|` measuring how far that rate is from the rate
//! `r[i]` which would track the target exactly. The objective minimises the
//! weighted slack, with later periods weighted more heavily so that the plan
//! converges on the target rather than lagging behind it:
//!
//! ```text
//! minimise    sum (i + 1) t[i]
//! subject to  t[i] - x[i] >= -r[i]
//!             t[i] + x[i] >=  r[i]
//!             |x[0] - x_current| <= a_max P
//!             |x[i] - x[i-1]|    <= a_max P
//!             P sum x[i]          = yaw at end of horizon
//!             -v_max <= x[i] <= v_max
//! ```
//!
//! The structure (number of periods, weights, bounds) is fixed when the model
//! is created, only the right hand sides change between solves. `microlp`
//! can't change the right hand side of a constraint in a solved problem, so
//! each solve builds a fresh `Problem` from the cached structure. What reuse
//! saves is the sizing decision and the buffers, not the LP setup.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem, Variable};
use thiserror::Error;

use super::PlannerParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A reusable movement model for a fixed number of periods.
#[derive(Debug, Clone)]
pub struct MovementModel {
    // ---- STRUCTURE ----
    period_s: f64,
    max_rate_rads: f64,
    max_rate_step_rads: f64,
    weights: Vec<f64>,

    // ---- RIGHT HAND SIDES ----
    current_rate_rads: f64,
    target_rates_rads: Vec<f64>,
    end_yaw_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("The movement model has no feasible solution")]
    Infeasible,

    #[error("The movement model is unbounded")]
    Unbounded,

    #[error("Expected {expected} target rates for the model, found {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("LP solver error: {0}")]
    SolverError(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MovementModel {
    /// Create a model for `periods` planning periods.
    pub fn new(periods: usize, params: &PlannerParams) -> Self {
        Self {
            period_s: params.period_s,
            max_rate_rads: params.max_yaw_rate_rads,
            max_rate_step_rads: params.max_yaw_accel_rads2 * params.period_s,
            weights: (1..=periods).map(|w| w as f64).collect(),
            current_rate_rads: 0.0,
            target_rates_rads: vec![0.0; periods],
            end_yaw_rad: 0.0,
        }
    }

    /// Number of periods in the model.
    pub fn periods(&self) -> usize {
        self.weights.len()
    }

    /// Update the right hand sides of the model for a new target.
    ///
    /// - `current_rate_rads` is the rate of the executing movement, which the
    ///   first period's rate must be reachable from.
    /// - `target_rates_rads` holds one tracking rate per period.
    /// - `end_yaw_rad` is the total yaw required by the end of the model.
    pub fn specialise(
        &mut self,
        current_rate_rads: f64,
        target_rates_rads: &[f64],
        end_yaw_rad: f64,
    ) -> Result<(), ModelError> {
        if target_rates_rads.len() != self.periods() {
            return Err(ModelError::WrongLength {
                expected: self.periods(),
                found: target_rates_rads.len(),
            });
        }

        self.current_rate_rads = current_rate_rads;
        self.target_rates_rads.copy_from_slice(target_rates_rads);
        self.end_yaw_rad = end_yaw_rad;

        Ok(())
    }

    /// Solve the model, returning one yaw rate per period.
    ///
    /// Nothing from a previous solve carries over, so the result depends only
    /// on the latest [`MovementModel::specialise`] call.
    pub fn solve(&self) -> Result<Vec<f64>, ModelError> {
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let step = self.max_rate_step_rads;

        let rates: Vec<Variable> = (0..self.periods())
            .map(|_| problem.add_var(0.0, (-self.max_rate_rads, self.max_rate_rads)))
            .collect();
        let slacks: Vec<Variable> = self
            .weights
            .iter()
            .map(|&w| problem.add_var(w, (0.0, f64::INFINITY)))
            .collect();

        // Slack is the absolute tracking error
        for ((&x, &t), &r) in rates.iter().zip(&slacks).zip(&self.target_rates_rads) {
            problem.add_constraint(expr(&[(t, 1.0), (x, -1.0)]), ComparisonOp::Ge, -r);
            problem.add_constraint(expr(&[(t, 1.0), (x, 1.0)]), ComparisonOp::Ge, r);
        }

        // Acceleration limits, anchored to the executing movement
        if let Some(&first) = rates.first() {
            problem.add_constraint(
                expr(&[(first, 1.0)]),
                ComparisonOp::Le,
                self.current_rate_rads + step,
            );
            problem.add_constraint(
                expr(&[(first, 1.0)]),
                ComparisonOp::Ge,
                self.current_rate_rads - step,
            );
        }
        for pair in rates.windows(2) {
            problem.add_constraint(expr(&[(pair[1], 1.0), (pair[0], -1.0)]), ComparisonOp::Le, step);
            problem.add_constraint(expr(&[(pair[1], 1.0), (pair[0], -1.0)]), ComparisonOp::Ge, -step);
        }

        // Total yaw over the horizon
        let mut total = LinearExpr::empty();
        for &x in rates.iter() {
            total.add(x, self.period_s);
        }
        problem.add_constraint(total, ComparisonOp::Eq, self.end_yaw_rad);

        let solution = problem.solve().map_err(|e| match e {
            microlp::Error::Infeasible => ModelError::Infeasible,
            microlp::Error::Unbounded => ModelError::Unbounded,
            #[allow(unreachable_patterns)]
            other => ModelError::SolverError(other.to_string()),
        })?;

        Ok(rates.iter().map(|&x| solution[x]).collect())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn expr(terms: &[(Variable, f64)]) -> LinearExpr {
    let mut e = LinearExpr::empty();
    for &(var, coeff) in terms {
        e.add(var, coeff);
    }
    e
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
