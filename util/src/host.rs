//! Host platform (linux for example) utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software
/// checkout (the directory containing `params/` and `sessions/`).
pub const SW_ROOT_ENV_VAR: &str = "TURRET_SW_ROOT";

/// Get the root directory of the turret software.
pub fn get_turret_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Get a short description of the host this executable is running on.
pub fn get_host_description() -> String {
    format!(
        "{} ({}), {} logical cores",
        env::consts::OS,
        env::consts::ARCH,
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    )
}
