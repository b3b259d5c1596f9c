//! Simulated actuators

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    f64::consts::FRAC_PI_2,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use log::trace;
use serde::Serialize;

use crate::eqpt::{
    stepper::{choose_microstep, step_frequency},
    Actuators, EqptError, PitchActuator, Valve, YawActuator,
};

use super::SimParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulated turret body shared by the actuator handles and the simulated
/// tracker.
#[derive(Debug, Clone)]
pub struct SimTurret {
    state: Arc<Mutex<TurretState>>,
}

/// Stepper driver configuration of the simulated yaw axis.
#[derive(Debug, Clone, PartialEq)]
pub struct StepperSim {
    /// Units: radians per whole step
    pub step_size_rad: f64,

    /// Units: hertz
    pub min_step_freq_hz: f64,

    pub available_microsteps: Vec<u8>,
}

/// Point in time view of the simulated turret.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TurretSnapshot {
    /// Units: radians
    pub yaw_rad: f64,

    /// Units: radians/second
    pub yaw_rate_rads: f64,

    /// Units: radians
    pub target_pitch_rad: f64,

    pub valve_open: bool,

    /// Microstep exponent the yaw driver is using, if a stepper is modelled.
    pub microstep: Option<u8>,

    /// Pulse frequency of the yaw driver, if a stepper is modelled.
    ///
    /// Units: hertz
    pub step_freq_hz: Option<f64>,

    pub yaw_commands: usize,

    /// Number of times the valve was opened from closed.
    pub valve_openings: usize,
}

#[derive(Debug)]
struct TurretState {
    yaw_rad: f64,
    yaw_rate_rads: f64,

    /// Time `yaw_rad` was last integrated to.
    yaw_updated: Option<Instant>,

    target_pitch_rad: f64,
    pitch_transition: Duration,
    valve_open: bool,

    max_yaw_rate_rads: f64,
    stepper: Option<StepperSim>,
    microstep: Option<u8>,
    step_freq_hz: Option<f64>,

    yaw_commands: usize,
    valve_openings: usize,
}

struct SimYaw(Arc<Mutex<TurretState>>);
struct SimPitch(Arc<Mutex<TurretState>>);
struct SimValve(Arc<Mutex<TurretState>>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimTurret {
    /// Create a turret at zero yaw which rejects yaw rates faster than
    /// `max_yaw_rate_rads`.
    pub fn new(max_yaw_rate_rads: f64, stepper: Option<StepperSim>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TurretState {
                yaw_rad: 0.0,
                yaw_rate_rads: 0.0,
                yaw_updated: None,
                target_pitch_rad: 0.0,
                pitch_transition: Duration::from_secs(0),
                valve_open: false,
                max_yaw_rate_rads,
                stepper,
                microstep: None,
                step_freq_hz: None,
                yaw_commands: 0,
                valve_openings: 0,
            })),
        }
    }

    pub fn from_params(params: &SimParams, max_yaw_rate_rads: f64) -> Self {
        Self::new(
            max_yaw_rate_rads,
            Some(StepperSim {
                step_size_rad: params.yaw_step_size_rad,
                min_step_freq_hz: params.min_step_freq_hz,
                available_microsteps: params.available_microsteps.clone(),
            }),
        )
    }

    /// Actuator handles driving this turret.
    pub fn actuators(&self) -> Actuators {
        Actuators {
            yaw: Box::new(SimYaw(self.state.clone())),
            pitch: Box::new(SimPitch(self.state.clone())),
            valve: Box::new(SimValve(self.state.clone())),
        }
    }

    /// Yaw of the turret at `at`, assuming the current rate holds.
    ///
    /// Units: radians
    pub fn yaw_at(&self, at: Instant) -> Result<f64, EqptError> {
        Ok(self.state.lock()?.yaw_at(at))
    }

    pub fn snapshot(&self) -> Result<TurretSnapshot, EqptError> {
        let state = self.state.lock()?;

        Ok(TurretSnapshot {
            yaw_rad: state.yaw_at(Instant::now()),
            yaw_rate_rads: state.yaw_rate_rads,
            target_pitch_rad: state.target_pitch_rad,
            valve_open: state.valve_open,
            microstep: state.microstep,
            step_freq_hz: state.step_freq_hz,
            yaw_commands: state.yaw_commands,
            valve_openings: state.valve_openings,
        })
    }
}

impl Default for SimTurret {
    fn default() -> Self {
        Self::new(f64::INFINITY, None)
    }
}

impl TurretState {
    fn yaw_at(&self, at: Instant) -> f64 {
        match self.yaw_updated {
            Some(t) => {
                self.yaw_rad + self.yaw_rate_rads * at.saturating_duration_since(t).as_secs_f64()
            }
            None => self.yaw_rad,
        }
    }
}

impl YawActuator for SimYaw {
    fn set_angular_velocity(&mut self, rate_rads: f64) -> Result<(), EqptError> {
        let mut state = self.0.lock()?;

        if !(rate_rads.abs() <= state.max_yaw_rate_rads) {
            return Err(EqptError::DemandOutOfRange {
                demand: rate_rads,
                min: -state.max_yaw_rate_rads,
                max: state.max_yaw_rate_rads,
            });
        }

        let now = Instant::now();
        state.yaw_rad = state.yaw_at(now);
        state.yaw_updated = Some(now);
        state.yaw_rate_rads = rate_rads;
        state.yaw_commands += 1;

        let driver = state.stepper.as_ref().and_then(|s| {
            choose_microstep(
                s.step_size_rad,
                s.min_step_freq_hz,
                rate_rads,
                &s.available_microsteps,
            )
            .map(|m| (m, step_frequency(s.step_size_rad, m, rate_rads)))
        });
        state.microstep = driver.map(|(m, _)| m);
        state.step_freq_hz = driver.map(|(_, f)| f);

        trace!(
            "Sim yaw rate {:.3} rad/s, microstep {:?}, step frequency {:?} Hz",
            rate_rads,
            state.microstep,
            state.step_freq_hz
        );

        Ok(())
    }
}

impl PitchActuator for SimPitch {
    fn set_target_position(&mut self, angle_rad: f64, transition: Duration) -> Result<(), EqptError> {
        if !(angle_rad.abs() <= FRAC_PI_2) {
            return Err(EqptError::DemandOutOfRange {
                demand: angle_rad,
                min: -FRAC_PI_2,
                max: FRAC_PI_2,
            });
        }

        let mut state = self.0.lock()?;
        state.target_pitch_rad = angle_rad;
        state.pitch_transition = transition;

        Ok(())
    }
}

impl Valve for SimValve {
    fn power_on(&mut self) -> Result<(), EqptError> {
        let mut state = self.0.lock()?;
        if !state.valve_open {
            state.valve_openings += 1;
        }
        state.valve_open = true;
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), EqptError> {
        self.0.lock()?.valve_open = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::thread;

    #[test]
    fn test_yaw_integration() {
        let turret = SimTurret::default();
        let mut act = turret.actuators();

        let t0 = Instant::now();
        assert_eq!(turret.yaw_at(t0).unwrap(), 0.0);

        act.yaw.set_angular_velocity(1.0).unwrap();
        thread::sleep(Duration::from_millis(20));
        act.yaw.set_angular_velocity(0.0).unwrap();

        // Turned for at least the sleep, and not much longer
        let yaw = turret.yaw_at(Instant::now()).unwrap();
        assert!(yaw >= 0.02 && yaw < 0.5, "yaw = {}", yaw);

        // Stationary
        thread::sleep(Duration::from_millis(10));
        assert_eq!(turret.yaw_at(Instant::now()).unwrap(), yaw);
        assert_eq!(turret.snapshot().unwrap().yaw_commands, 2);
    }

    #[test]
    fn test_demand_limits() {
        let turret = SimTurret::new(1.0, None);
        let mut act = turret.actuators();

        assert!(matches!(
            act.yaw.set_angular_velocity(-1.5),
            Err(EqptError::DemandOutOfRange { .. })
        ));
        assert!(act.yaw.set_angular_velocity(f64::NAN).is_err());
        assert!(act.pitch.set_target_position(2.0, Duration::from_millis(50)).is_err());

        act.pitch.set_target_position(0.3, Duration::from_millis(50)).unwrap();
        assert_eq!(turret.snapshot().unwrap().target_pitch_rad, 0.3);
        assert_eq!(turret.snapshot().unwrap().yaw_commands, 0);
    }

    #[test]
    fn test_valve_and_microstep() {
        let turret = SimTurret::new(
            2.0,
            Some(StepperSim {
                step_size_rad: std::f64::consts::PI / 100.0,
                min_step_freq_hz: 100.0,
                available_microsteps: vec![0, 1, 2, 3, 4],
            }),
        );
        let mut act = turret.actuators();

        act.valve.power_on().unwrap();
        act.valve.power_on().unwrap();
        act.valve.power_off().unwrap();
        act.valve.power_on().unwrap();

        act.yaw.set_angular_velocity(0.5).unwrap();

        let s = turret.snapshot().unwrap();
        assert!(s.valve_open);
        assert_eq!(s.valve_openings, 2);
        assert_eq!(s.microstep, Some(3));
        assert_abs_diff_eq!(
            s.step_freq_hz.unwrap(),
            0.5 * 8.0 / (std::f64::consts::PI / 100.0),
            epsilon = 1e-9
        );
        assert!(s.step_freq_hz.unwrap() >= 100.0);
    }
}
