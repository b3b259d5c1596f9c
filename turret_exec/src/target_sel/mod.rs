//! # Target Selector
//!
//! Scores each candidate target and picks the best one to engage. Targets
//! which the ballistic solver reports as unreachable are never selected.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use util::maths::{clamp, lin_map};

use crate::{
    aim::{self, AimSolution, BallisticParams},
    eqpt::{CameraGeometry, TargetId, TrackedTarget},
};

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

pub use params::SelectorParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Stateless target selector.
#[derive(Debug, Clone)]
pub struct TargetSelector {
    params: SelectorParams,
    ballistic: BallisticParams,
    geometry: CameraGeometry,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TargetSelector {
    pub fn new(
        params: SelectorParams,
        ballistic: BallisticParams,
        geometry: CameraGeometry,
    ) -> Self {
        Self {
            params,
            ballistic,
            geometry,
        }
    }

    pub fn params(&self) -> &SelectorParams {
        &self.params
    }

    /// Score a single candidate, or `None` if it can't be hit.
    pub fn score(&self, target: &TrackedTarget) -> Option<f64> {
        let aim = aim::solve_target(target, &self.ballistic);

        if aim.unreachable {
            None
        } else {
            Some(self.score_reachable(target, &aim))
        }
    }

    /// Select the best candidate, ties going to the earliest in the slice.
    pub fn select(&self, candidates: &[TrackedTarget]) -> Option<TrackedTarget> {
        self.select_preferring(candidates, None)
    }

    /// Select the best candidate, adding the continuity bonus to the target
    /// with the `preferred` id.
    pub fn select_preferring(
        &self,
        candidates: &[TrackedTarget],
        preferred: Option<TargetId>,
    ) -> Option<TrackedTarget> {
        let mut best: Option<(f64, &TrackedTarget)> = None;

        for candidate in candidates {
            let mut score = match self.score(candidate) {
                Some(s) => s,
                None => continue,
            };

            if Some(candidate.id) == preferred {
                score += self.params.continuity_bonus;
            }

            trace!("Candidate {} scored {:.3}", candidate.id, score);

            match best {
                Some((best_score, _)) if best_score >= score => (),
                _ => best = Some((score, candidate)),
            }
        }

        best.map(|(_, t)| *t)
    }

    fn score_reachable(&self, target: &TrackedTarget, aim: &AimSolution) -> f64 {
        let yaw_term = clamp(
            lin_map(
                (0.0, self.geometry.fov_h_rad / 2.0),
                (1.0, -1.0),
                aim.yaw_rad.abs(),
            ),
            -1.0,
            1.0,
        );

        let distance_term = clamp(
            lin_map(
                (0.0, self.geometry.max_range_m),
                (1.0, -1.0),
                target.position.distance_m,
            ),
            -1.0,
            1.0,
        );

        let closing_term = clamp(
            -target.velocity.distance_m / self.params.ref_closing_speed_ms,
            -1.0,
            1.0,
        );

        self.params.yaw_weight * yaw_term
            + self.params.distance_weight * distance_term
            + self.params.closing_speed_weight * closing_term
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
