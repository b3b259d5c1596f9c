//! Main turret executable entry point.
//!
//! # Architecture
//!
//! The executable runs the turret against simulated equipment:
//!
//!     - Initialise the session and logging
//!     - Load parameters
//!     - Build the simulated tracker and actuators
//!     - Start the motion controller
//!     - Run the execution loop (in the foreground, or wait while the
//!       controller runs it in the background) for the configured duration
//!     - Save the final plan and shut down

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

// Internal
use turret_lib::{
    eqpt::Tracker,
    motion_ctrl::{AdvanceMode, MotionCtrl},
    sim::{SimParams, SimTracker, SimTurret},
    traj_plan::PlannerParams,
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Period at which the background mode main loop reports status.
const STATUS_PERIOD: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("turret_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Turret Executable\n");
    info!("Running on: {}", host::get_host_description());
    info!("Started at: {}", chrono::Local::now().to_rfc2822());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    // Motion control loads its own parameters, the simulation only needs the
    // yaw rate limit from the planner's
    let planner_params: PlannerParams =
        util::params::load("traj_plan.toml").wrap_err("Could not load trajectory planner params")?;

    let sim_params: SimParams =
        util::params::load("sim.toml").wrap_err("Could not load simulation params")?;
    sim_params
        .validate()
        .map_err(|e| eyre!("Invalid simulation params: {}", e))?;

    info!("Simulation parameters loaded");

    // ---- INITIALISE EQUIPMENT ----

    let run_duration = Duration::from_secs_f64(sim_params.run_duration_s);
    let turret = SimTurret::from_params(&sim_params, planner_params.max_yaw_rate_rads);
    let tracker: Arc<dyn Tracker> = Arc::new(SimTracker::new(sim_params, turret.clone()));

    info!(
        "Simulated equipment initialised, camera geometry: {:?}",
        tracker.camera_geometry()
    );

    // ---- INITIALISE MODULES ----

    let archiver = Archiver::from_session_path(&session, "movements.csv")
        .wrap_err("Failed to create the movement archive")?;

    let mut motion_ctrl = MotionCtrl::from_params(tracker, turret.actuators(), Some(archiver))
        .wrap_err("Failed to start motion control")?;
    let advance_mode = motion_ctrl.params().advance_mode;

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Running for {:?}", run_duration);
    let start = Instant::now();

    match advance_mode {
        AdvanceMode::Foreground => {
            let mut executor = motion_ctrl
                .take_executor()
                .ok_or_else(|| eyre!("No executor available in foreground mode"))?;

            while start.elapsed() < run_duration && motion_ctrl.is_running() {
                executor
                    .step()
                    .wrap_err("Error while executing the movement plan")?;
            }

            executor.stop();
        }
        AdvanceMode::Background => {
            while start.elapsed() < run_duration && motion_ctrl.is_running() {
                thread::sleep(STATUS_PERIOD.min(run_duration.saturating_sub(start.elapsed())));

                match turret.snapshot() {
                    Ok(s) => info!(
                        "Turret at yaw {:.3} rad ({:.3} rad/s), valve {}",
                        s.yaw_rad,
                        s.yaw_rate_rads,
                        if s.valve_open { "open" } else { "closed" }
                    ),
                    Err(e) => warn!("Could not read the turret state: {}", e),
                }
            }
        }
    }

    // ---- SHUTDOWN ----

    session.save(
        "plan.json",
        motion_ctrl
            .plan_records()
            .wrap_err("Could not read the final plan")?,
    );

    motion_ctrl
        .shutdown()
        .wrap_err("Motion control did not shut down cleanly")?;

    let final_state = turret.snapshot().wrap_err("Could not read the turret state")?;
    info!(
        "Final turret state: {}",
        serde_json::to_string(&final_state).wrap_err("Could not serialise the turret state")?
    );

    info!("End of execution");

    session.exit();

    Ok(())
}
