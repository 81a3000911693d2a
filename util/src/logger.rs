//! Logger setup for the navigation executables
//!
//! Lines are prefixed with the time since the session started and a three letter level. The
//! terminal copy is coloured, the session log file copy is plain text.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info, Level};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Third party targets which are limited to `INFO`, they are very chatty below that.
const QUIET_TARGETS: [&str; 2] = ["serialport", "gstreamer"];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of `INFO` or more verbose, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Unknown log level name \"{0}\"")]
    UnknownLevelName(String),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// # Notes
///
/// - `min_level` must be `log::Level::Info` or more verbose, so that drive
///   commands always reach the log.
/// - Must only be called once per process.
pub fn logger_init(
    min_level: LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new().level(min_level);
    for target in QUIET_TARGETS.iter() {
        dispatch = dispatch.level_for(*target, LevelFilter::Info);
    }

    dispatch
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{}",
                        format_line(
                            session::get_elapsed_seconds(),
                            &level_to_str(record.level()),
                            record.level(),
                            record.target(),
                            message
                        )
                    ))
                })
                .chain(std::io::stdout())
        )
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{}",
                        format_line(
                            session::get_elapsed_seconds(),
                            &level_to_plain_str(record.level()),
                            record.level(),
                            record.target(),
                            message
                        )
                    ))
                })
                .chain(log_file)
        )
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

/// Parse a log level name (`info`, `debug` or `trace`) as given on the command line.
pub fn parse_level(name: &str) -> Result<LevelFilter, LoggerInitError> {
    let level: LevelFilter = name
        .parse()
        .map_err(|_| LoggerInitError::UnknownLevelName(name.to_string()))?;

    if level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(level))
    }

    Ok(level)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build one log line. The target is only shown for debug and trace lines.
fn format_line(
    elapsed_s: f64,
    level_str: &dyn std::fmt::Display,
    level: Level,
    target: &str,
    message: &std::fmt::Arguments
) -> String {
    if level > Level::Info {
        format!("[{:10.6} {}] {}: {}", elapsed_s, level_str, target, message)
    }
    else {
        format!("[{:10.6} {}] {}", elapsed_s, level_str, message)
    }
}

/// Get the coloured representation of a log level
fn level_to_str(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info  => "INF".normal(),
        Level::Warn  => "WRN".yellow(),
        Level::Error => "ERR".red().bold()
    }
}

/// Get the plain representation of a log level, for the log file
fn level_to_plain_str(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info  => "INF",
        Level::Warn  => "WRN",
        Level::Error => "ERR"
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
