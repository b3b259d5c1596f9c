//! Logger initialisation
//!
//! Every record is written to the session's log file. The terminal gets the
//! same records up to `DEBUG`, since the per-movement trace output of the
//! motion controller is too fast to read live. Debug and trace records carry
//! the name of the thread and module they came from, so the planning and
//! execution threads can be told apart.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info, Record};
use std::fmt::Arguments;
use std::thread;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Most verbose level echoed to the terminal.
const MAX_STDOUT_LEVEL: LevelFilter = LevelFilter::Debug;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// # Notes
///
/// - `min_level` must be at least as verbose as `log::Level::Info`.
/// - Only the first call in a process can succeed.
pub fn logger_init(
    min_level: LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let stdout = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("{}", format_record(message, record, true))))
        .level(min_level.min(MAX_STDOUT_LEVEL))
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("{}", format_record(message, record, false))))
        .level(min_level)
        .chain(log_file);

    fern::Dispatch::new()
        // The LP solver is very chatty at debug level
        .level_for("microlp", LevelFilter::Info)
        .chain(stdout)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?} (terminal {:?})", min_level, min_level.min(MAX_STDOUT_LEVEL));
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn format_record(message: &Arguments, record: &Record, colour: bool) -> String {
    let level = if colour {
        level_to_str(record.level()).to_string()
    } else {
        level_to_plain_str(record.level()).to_string()
    };

    if record.level() > log::Level::Info {
        format!(
            "[{:10.6} {}] ({}) {}: {}",
            session::get_elapsed_seconds(),
            level,
            thread::current().name().unwrap_or("unnamed"),
            record.target(),
            message
        )
    } else {
        format!(
            "[{:10.6} {}] {}",
            session::get_elapsed_seconds(),
            level,
            message
        )
    }
}

/// Coloured representation of a log level.
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}

fn level_to_plain_str(level: log::Level) -> &'static str {
    match level {
        log::Level::Trace => "TRC",
        log::Level::Debug => "DBG",
        log::Level::Info => "INF",
        log::Level::Warn => "WRN",
        log::Level::Error => "ERR",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_level_strings() {
        assert_eq!(level_to_plain_str(log::Level::Warn), "WRN");
        assert!(level_to_str(log::Level::Error).to_string().contains("ERR"));
    }
}
