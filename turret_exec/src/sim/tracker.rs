//! Simulated tracker
//!
//! Frames are produced lazily: a call to `wait_for_targets` sleeps until the
//! next frame is due and then observes every simulated person from the
//! turret's current yaw.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use log::{trace, warn};
use nalgebra::{Rotation3, Vector3};
use util::cancel::CancelToken;

use crate::eqpt::{CameraGeometry, TrackedTarget, Tracker};

use super::{SimParams, SimTurret};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct SimTracker {
    params: SimParams,
    camera_offset_m: Vector3<f64>,
    turret: SimTurret,

    /// Time the people are at their start positions.
    start: Instant,

    frames: Mutex<FrameState>,
}

#[derive(Debug)]
struct FrameState {
    next_frame: Instant,
    targets: Vec<TrackedTarget>,

    /// Turret yaw when `targets` were observed.
    yaw_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimTracker {
    pub fn new(params: SimParams, turret: SimTurret) -> Self {
        let start = Instant::now();
        let o = params.camera_offset_m;

        Self {
            camera_offset_m: Vector3::new(o[0], o[1], o[2]),
            params,
            turret,
            start,
            frames: Mutex::new(FrameState {
                next_frame: start,
                targets: Vec::new(),
                yaw_rad: 0.0,
            }),
        }
    }

    /// Observe every visible person at `at` with the turret at `yaw_rad`.
    ///
    /// Velocities are estimated against `previous`, observed at
    /// `previous_yaw_rad`.
    fn observe(
        &self,
        at: Instant,
        yaw_rad: f64,
        previous: &[TrackedTarget],
        previous_yaw_rad: f64,
    ) -> Vec<TrackedTarget> {
        let elapsed = at.saturating_duration_since(self.start).as_secs_f64();
        let to_sensor = Rotation3::from_axis_angle(&Vector3::y_axis(), -yaw_rad);
        let half_fov = 0.5 * self.params.fov_h_rad;

        self.params
            .people
            .iter()
            .filter_map(|person| {
                let start = Vector3::new(person.start_m[0], person.start_m[1], person.start_m[2]);
                let vel = Vector3::new(
                    person.velocity_ms[0],
                    person.velocity_ms[1],
                    person.velocity_ms[2],
                );

                let point = to_sensor * (start + vel * elapsed) - self.camera_offset_m;
                if point.z <= 0.0 {
                    return None;
                }

                let target =
                    TrackedTarget::from_sensor_point(person.id, at, &point, &self.camera_offset_m)?;
                if target.position.yaw_rad.abs() > half_fov
                    || target.position.distance_m > self.params.max_range_m
                {
                    return None;
                }

                match previous.iter().find(|p| p.id == person.id) {
                    Some(prev) => {
                        // Express the previous observation in this frame
                        let mut prev = *prev;
                        prev.position.yaw_rad -= yaw_rad - previous_yaw_rad;

                        Some(target.with_velocity_from(
                            &prev,
                            self.params.velocity_smoothing,
                            &self.params.velocity_dead_zone,
                        ))
                    }
                    None => Some(target),
                }
            })
            .collect()
    }
}

impl Tracker for SimTracker {
    fn targets(&self) -> Vec<TrackedTarget> {
        match self.frames.lock() {
            Ok(f) => f.targets.clone(),
            Err(_) => {
                warn!("Sim tracker frame state poisoned");
                Vec::new()
            }
        }
    }

    fn wait_for_targets(&self, timeout: Duration, cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        let now = Instant::now();

        let next_frame = match self.frames.lock() {
            Ok(f) => f.next_frame,
            Err(_) => return false,
        };

        // Next frame isn't due within the timeout
        if next_frame > now + timeout {
            cancel.wait_timeout(timeout);
            return false;
        }

        if next_frame > now && !cancel.wait_timeout(next_frame - now) {
            return false;
        }

        let at = Instant::now();
        let yaw_rad = match self.turret.yaw_at(at) {
            Ok(y) => y,
            Err(e) => {
                warn!("Could not read the sim turret yaw: {}", e);
                return false;
            }
        };

        let mut frames = match self.frames.lock() {
            Ok(f) => f,
            Err(_) => return false,
        };

        let targets = self.observe(at, yaw_rad, &frames.targets, frames.yaw_rad);
        trace!("Sim frame with {} targets at yaw {:.3}", targets.len(), yaw_rad);

        frames.targets = targets;
        frames.yaw_rad = yaw_rad;
        frames.next_frame = (frames.next_frame
            + Duration::from_secs_f64(self.params.frame_period_s))
        .max(at);

        true
    }

    fn camera_geometry(&self) -> CameraGeometry {
        self.params.camera_geometry()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{eqpt::TargetPosition, sim::SimPerson};
    use approx::assert_abs_diff_eq;

    fn params(people: Vec<SimPerson>) -> SimParams {
        SimParams {
            frame_period_s: 0.01,
            fov_h_rad: 1.0,
            max_range_m: 8.0,
            camera_offset_m: [0.0, 0.0, 0.0],
            velocity_smoothing: 0.0,
            velocity_dead_zone: TargetPosition::default(),
            people,
            yaw_step_size_rad: 0.0314,
            min_step_freq_hz: 100.0,
            available_microsteps: vec![0],
            run_duration_s: 1.0,
        }
    }

    fn person(id: u32, start_m: [f64; 3], velocity_ms: [f64; 3]) -> SimPerson {
        SimPerson {
            id,
            start_m,
            velocity_ms,
        }
    }

    #[test]
    fn test_visibility() {
        let tracker = SimTracker::new(
            params(vec![
                person(1, [0.0, 0.5, 4.0], [0.0; 3]),
                // Outside the field of view
                person(2, [4.0, 0.0, 1.0], [0.0; 3]),
                // Behind
                person(3, [0.0, 0.0, -3.0], [0.0; 3]),
                // Too far
                person(4, [0.0, 0.0, 12.0], [0.0; 3]),
            ]),
            SimTurret::default(),
        );

        let now = Instant::now();
        let seen = tracker.observe(now, 0.0, &[], 0.0);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, 1);
        assert_abs_diff_eq!(seen[0].position.yaw_rad, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(seen[0].position.height_m, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(seen[0].position.distance_m, 4.0, epsilon = 1e-12);

        // Turning right moves the person left in the frame
        let seen = tracker.observe(now, 0.2, &[], 0.0);
        assert_abs_diff_eq!(seen[0].position.yaw_rad, -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(seen[0].position.distance_m, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_ignores_turret_rotation() {
        let tracker = SimTracker::new(
            params(vec![person(1, [0.0, 0.0, 4.0], [0.0, 0.0, -1.0])]),
            SimTurret::default(),
        );

        let t0 = tracker.start;
        let t1 = t0 + Duration::from_millis(100);

        let first = tracker.observe(t0, 0.0, &[], 0.0);
        assert_eq!(first[0].velocity, TargetPosition::default());

        // The turret turned between frames, but the person only walked closer
        let second = tracker.observe(t1, 0.1, &first, 0.0);
        assert_abs_diff_eq!(second[0].position.yaw_rad, -0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(second[0].velocity.yaw_rad, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(second[0].velocity.distance_m, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_wait_for_frames() {
        let tracker = SimTracker::new(
            SimParams {
                frame_period_s: 0.5,
                ..params(vec![person(1, [0.0, 0.0, 4.0], [0.0; 3])])
            },
            SimTurret::default(),
        );
        let cancel = CancelToken::new();

        assert!(tracker.targets().is_empty());
        assert!(tracker.wait_for_targets(Duration::from_secs(1), &cancel));
        assert_eq!(tracker.targets().len(), 1);

        // Next frame is half a second away
        assert!(!tracker.wait_for_targets(Duration::from_millis(1), &cancel));
        assert!(tracker.wait_for_targets(Duration::from_secs(1), &cancel));

        cancel.cancel();
        assert!(!tracker.wait_for_targets(Duration::from_secs(1), &cancel));
    }
}
