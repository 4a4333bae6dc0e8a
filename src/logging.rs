//! Logging facade used by every component of marian-io.
//!
//! Messages are addressed to a named logger (`general` or `valid`) and a level
//! given by name, mirroring how the training toolkit logs:
//!
//! ```ignore
//! log_at!(info, "[data] Vocab size: {}", vocab_size);
//! log_valid!(warn, "No improvement for {} stalls", stalls);
//! abort_if!(!path.exists(), "File '{}' does not exist", path.display());
//! ```
//!
//! Records go through the `log` facade to an `env_logger` backend installed by
//! [`create_loggers`]. Until that happens, non-critical messages are dropped
//! and critical ones still reach stderr through a fallback sink.

use crate::error::{FileStreamError, Result};
use log::Log;
use parking_lot::RwLock;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::panic::Location;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Logger for general progress and diagnostics.
pub const GENERAL: &str = "general";
/// Logger for validation output; its messages are prefixed with `[valid] `.
pub const VALID: &str = "valid";

static INITIALIZED: OnceLock<()> = OnceLock::new();
static NODE_PREFIX: RwLock<Option<String>> = parking_lot::const_rwlock(None);

/// Severity levels understood by [`checked_log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl Level {
    /// Parse a level from its lowercase name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    fn as_log_level(self) -> log::Level {
        match self {
            Self::Trace => log::Level::Trace,
            Self::Debug => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warn => log::Level::Warn,
            Self::Error | Self::Critical => log::Level::Error,
        }
    }

    fn as_filter(self) -> log::LevelFilter {
        self.as_log_level().to_level_filter()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sink configuration for [`create_loggers`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct LoggingConfig {
    /// Minimum level written to the sinks
    pub level: Level,
    /// Suppress the stderr sink (log files still receive everything)
    pub quiet: bool,
    /// Files that receive `general` records, opened in append mode
    pub log_files: Vec<PathBuf>,
    /// Files that receive `valid` records, opened in append mode
    pub valid_log_files: Vec<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            quiet: false,
            log_files: Vec::new(),
            valid_log_files: Vec::new(),
        }
    }
}

/// Writes each record to every configured sink.
struct Tee {
    sinks: Vec<Box<dyn Write + Send>>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in &mut self.sinks {
            sink.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Sends each record to the backend of the logger it is addressed to.
struct Router {
    general: env_logger::Logger,
    valid: env_logger::Logger,
}

impl Router {
    fn pick(&self, target: &str) -> &env_logger::Logger {
        if target == VALID {
            &self.valid
        } else {
            &self.general
        }
    }
}

impl Log for Router {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.pick(metadata.target()).enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        self.pick(record.target()).log(record)
    }

    fn flush(&self) {
        self.general.flush();
        self.valid.flush();
    }
}

fn open_sinks(quiet: bool, files: &[PathBuf]) -> Result<Tee> {
    let mut sinks: Vec<Box<dyn Write + Send>> = Vec::new();
    if !quiet {
        sinks.push(Box::new(io::stderr()));
    }
    for path in files {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                FileStreamError::file_error(
                    format!("Failed to open log file {}", path.display()),
                    e,
                )
            })?;
        sinks.push(Box::new(file));
    }
    Ok(Tee { sinks })
}

fn build_backend(level: Level, tee: Tee) -> env_logger::Logger {
    env_logger::Builder::new()
        .filter_level(level.as_filter())
        .parse_default_env()
        .format(format_record)
        .target(env_logger::Target::Pipe(Box::new(tee)))
        .build()
}

/// Install the process-wide logging backend.
///
/// Both loggers write to stderr unless `quiet` is set. `general` records also
/// go to `log_files` and `valid` records to `valid_log_files`. `RUST_LOG`
/// still overrides the configured level filter. Calling this twice is a
/// configuration error.
pub fn create_loggers(config: &LoggingConfig) -> Result<()> {
    let router = Router {
        general: build_backend(config.level, open_sinks(config.quiet, &config.log_files)?),
        valid: build_backend(
            config.level,
            open_sinks(config.quiet, &config.valid_log_files)?,
        ),
    };
    let max_level = router.general.filter().max(router.valid.filter());

    log::set_boxed_logger(Box::new(router))
        .map_err(|e| FileStreamError::config(format!("Loggers already initialized: {e}")))?;
    log::set_max_level(max_level);

    let _ = INITIALIZED.set(());
    Ok(())
}

/// Whether [`create_loggers`] has installed a backend.
pub fn is_initialized() -> bool {
    INITIALIZED.get().is_some()
}

/// Prefix every subsequent record with `[<node_id>] `.
pub fn switch_to_multinode_logging(node_id: impl Into<String>) {
    *NODE_PREFIX.write() = Some(node_id.into());
}

pub fn node_prefix() -> Option<String> {
    NODE_PREFIX.read().clone()
}

fn format_record(buf: &mut env_logger::fmt::Formatter, record: &log::Record<'_>) -> io::Result<()> {
    let timestamp = buf.timestamp_seconds();
    let node = NODE_PREFIX
        .read()
        .as_deref()
        .map(|id| format!("[{id}] "))
        .unwrap_or_default();
    let valid = if record.target() == VALID { "[valid] " } else { "" };
    writeln!(buf, "[{timestamp}] {node}{valid}{}", record.args())
}

/// Where a message addressed to `level_name` ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// No backend yet and not critical
    Drop,
    /// No backend yet, critical: stderr fallback
    Fallback,
    Emit(Level),
    Unknown,
}

fn route(initialized: bool, level_name: &str) -> Route {
    if !initialized {
        return if level_name == "critical" {
            Route::Fallback
        } else {
            Route::Drop
        };
    }
    match Level::from_name(level_name) {
        Some(level) => Route::Emit(level),
        None => Route::Unknown,
    }
}

/// Log `args` to `logger` at the level named `level_name`.
///
/// This is the single entry point behind [`log_at!`](crate::log_at),
/// [`log_valid!`](crate::log_valid) and [`abort!`](crate::abort).
pub fn checked_log(logger: &str, level_name: &str, args: fmt::Arguments<'_>) {
    match route(is_initialized(), level_name) {
        Route::Drop => {}
        Route::Fallback => eprintln!("Error: {args} - aborting"),
        Route::Emit(level) => emit(logger, level, args),
        Route::Unknown => emit(
            logger,
            Level::Warn,
            format_args!("Unknown log level '{level_name}' for logger '{logger}'"),
        ),
    }
}

fn emit(logger: &str, level: Level, args: fmt::Arguments<'_>) {
    if level == Level::Critical {
        log::log!(target: logger, level.as_log_level(), "critical: {}", args);
    } else {
        log::log!(target: logger, level.as_log_level(), "{}", args);
    }
}

/// Print the current call stack to stderr.
pub fn log_call_stack() {
    let trace = std::backtrace::Backtrace::force_capture();
    eprintln!("Stack trace:\n{trace}");
}

/// Report a critical error and terminate the process.
///
/// `location` and `function` identify the offending call site in the final
/// `Aborted from ...` line.
pub fn abort_with(location: &Location<'_>, function: &str, args: fmt::Arguments<'_>) -> ! {
    checked_log(GENERAL, "critical", args);
    log::logger().flush();
    log_call_stack();
    eprintln!(
        "Aborted from {} in {}: {}",
        function,
        location.file(),
        location.line()
    );
    std::process::abort()
}

/// Log to the `general` logger: `log_at!(info, "[data] {} sentences", n)`.
#[macro_export]
macro_rules! log_at {
    ($level:ident, $($arg:tt)+) => {
        $crate::logging::checked_log(
            $crate::logging::GENERAL,
            stringify!($level),
            format_args!($($arg)+),
        )
    };
}

/// Log to the `valid` logger.
#[macro_export]
macro_rules! log_valid {
    ($level:ident, $($arg:tt)+) => {
        $crate::logging::checked_log(
            $crate::logging::VALID,
            stringify!($level),
            format_args!($($arg)+),
        )
    };
}

/// Log a critical message with the call stack and abort the process.
#[macro_export]
macro_rules! abort {
    ($($arg:tt)+) => {
        $crate::logging::abort_with(
            ::std::panic::Location::caller(),
            module_path!(),
            format_args!($($arg)+),
        )
    };
}

/// [`abort!`] when `condition` holds.
#[macro_export]
macro_rules! abort_if {
    ($condition:expr, $($arg:tt)+) => {
        if $condition {
            $crate::abort!($($arg)+);
        }
    };
}
