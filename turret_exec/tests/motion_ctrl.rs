//! Motion control running against the simulated equipment

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use turret_lib::{
    aim::BallisticParams,
    eqpt::Tracker,
    motion_ctrl::{AdvanceMode, MotionCtrl, MotionCtrlParams, StepOutcome},
    sim::{SimParams, SimPerson, SimTracker, SimTurret},
    target_sel::{SelectorParams, TargetSelector},
    traj_plan::{PlannerParams, TrajPlanner},
};

const BALLISTIC: BallisticParams = BallisticParams {
    launch_speed_ms: 10.0,
    drag_decel_ms2: 0.0,
    gravity_ms2: 9.81,
};

fn sim_params(people: Vec<SimPerson>) -> SimParams {
    SimParams {
        frame_period_s: 0.03,
        fov_h_rad: 1.2,
        max_range_m: 8.0,
        camera_offset_m: [0.0, 0.0, 0.0],
        velocity_smoothing: 0.0,
        velocity_dead_zone: Default::default(),
        people,
        yaw_step_size_rad: 0.0314,
        min_step_freq_hz: 200.0,
        available_microsteps: vec![0, 1, 2, 3],
        run_duration_s: 2.0,
    }
}

fn build(people: Vec<SimPerson>, advance_mode: AdvanceMode) -> (MotionCtrl, SimTurret) {
    let planner_params = PlannerParams::default();
    let sim = sim_params(people);

    let turret = SimTurret::from_params(&sim, planner_params.max_yaw_rate_rads);
    let tracker: Arc<dyn Tracker> = Arc::new(SimTracker::new(sim, turret.clone()));

    let selector = TargetSelector::new(
        SelectorParams {
            yaw_weight: 1.0,
            distance_weight: 1.0,
            closing_speed_weight: 0.5,
            ref_closing_speed_ms: 1.0,
            continuity_bonus: 0.3,
        },
        BALLISTIC,
        tracker.camera_geometry(),
    );
    let planner = TrajPlanner::new(planner_params, BALLISTIC).unwrap();

    let params = MotionCtrlParams {
        search_speed_rads: 0.3,
        plan_horizon_periods: 20,
        tracking_timeout_s: 0.2,
        exec_poll_period_s: 0.01,
        history_retention_s: 2.0,
        compensate_rotation: true,
        advance_mode,
    };

    let ctrl = MotionCtrl::new(
        params,
        selector,
        planner,
        tracker,
        turret.actuators(),
        None,
    )
    .unwrap();

    (ctrl, turret)
}

/// A person standing still 3 m away, 0.25 rad to the right.
fn still_person() -> SimPerson {
    SimPerson {
        id: 5,
        start_m: [3.0 * 0.25f64.sin(), 0.0, 3.0 * 0.25f64.cos()],
        velocity_ms: [0.0; 3],
    }
}

#[test]
fn test_background_engages_still_target() {
    let (mut ctrl, turret) = build(vec![still_person()], AdvanceMode::Background);
    assert!(ctrl.take_executor().is_none());

    thread::sleep(Duration::from_secs(2));

    let s = turret.snapshot().unwrap();
    assert!(ctrl.plan_generation().unwrap() > 0);
    assert!((s.yaw_rad - 0.25).abs() < 0.1, "yaw = {}", s.yaw_rad);
    assert!(s.valve_openings > 0);
    assert!(s.microstep.is_some());

    ctrl.shutdown().unwrap();

    // Turret is stopped and safe
    let s = turret.snapshot().unwrap();
    assert_eq!(s.yaw_rate_rads, 0.0);
    assert!(!s.valve_open);
    assert!(!ctrl.is_running());

    // Shutting down twice is harmless
    ctrl.shutdown().unwrap();
}

#[test]
fn test_foreground_engages_still_target() {
    let (mut ctrl, turret) = build(vec![still_person()], AdvanceMode::Foreground);
    let mut executor = ctrl.take_executor().unwrap();
    assert!(ctrl.take_executor().is_none());

    let start = Instant::now();
    let mut advances = 0;
    while start.elapsed() < Duration::from_secs(2) {
        if let StepOutcome::Advanced { .. } = executor.step().unwrap() {
            advances += 1;
        }
    }

    let s = turret.snapshot().unwrap();
    assert!(advances > 0);
    assert!((s.yaw_rad - 0.25).abs() < 0.1, "yaw = {}", s.yaw_rad);
    assert!(s.valve_openings > 0);

    ctrl.shutdown().unwrap();
    assert_eq!(executor.step().unwrap(), StepOutcome::Cancelled);

    executor.stop();
    let s = turret.snapshot().unwrap();
    assert_eq!(s.yaw_rate_rads, 0.0);
    assert!(!s.valve_open);
}

#[test]
fn test_searches_without_targets() {
    let (mut ctrl, turret) = build(Vec::new(), AdvanceMode::Background);

    thread::sleep(Duration::from_millis(500));

    let s = turret.snapshot().unwrap();
    assert_eq!(ctrl.plan_generation().unwrap(), 0);
    assert_eq!(s.yaw_rate_rads, 0.3);
    assert!(s.yaw_rad > 0.0);
    assert_eq!(s.valve_openings, 0);

    let current = ctrl.current_movement().unwrap();
    assert_eq!(current.duration, None);
    assert_eq!(ctrl.plan_records().unwrap().len(), 1);

    ctrl.shutdown().unwrap();
}
