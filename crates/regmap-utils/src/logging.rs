//! # Logging Utilities
//!
//! Logging infrastructure for the regmap tools using `tracing`.
//!
//! Standard output is reserved for the generated JSON document, so every
//! console layer installed here writes to **stderr**.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=regmap_core=trace`)
//! - `REGMAP_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `REGMAP_LOG_FILE`: Optional path to an additional log file; `{date}` in it
//!   expands to the current UTC date (`logs/{date}-regmap.log`)
//!
//! ## Examples
//!
//! ```rust,no_run
//! use regmap_utils::{LogFormat, LogLevel, init_logging_with_level};
//!
//! let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
//!     .expect("Failed to initialize logging");
//! tracing::debug!("walking compile units");
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Human-readable format (default)
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level (default)
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Keeps the background file writer alive.
///
/// Dropping the guard flushes any buffered file output, so hold it until
/// `main` returns.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment.
///
/// Reads `RUST_LOG` (default `warn`), `REGMAP_LOG_FORMAT` and `REGMAP_LOG_FILE`.
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed or `REGMAP_LOG_FORMAT`
/// names an unknown format.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = match env::var("REGMAP_LOG_FORMAT") {
        Ok(value) => LogFormat::from_str(&value)?,
        Err(_) => LogFormat::Pretty,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()));
    init_logging_internal(format, env_filter)
}

/// Initialize logging with an explicit level, ignoring `RUST_LOG`.
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format, EnvFilter::new(Level::from(level).to_string()))
}

/// Placeholder in `REGMAP_LOG_FILE` replaced by the current UTC date.
const DATE_PLACEHOLDER: &str = "{date}";

/// Log file path for `template`, with [`DATE_PLACEHOLDER`] expanded to today
/// as `YYYY-MM-DD`.
fn log_file_path(template: &str) -> PathBuf
{
    let today = Utc::now().format("%Y-%m-%d").to_string();
    expand_date(template, &today)
}

fn expand_date(template: &str, today: &str) -> PathBuf
{
    PathBuf::from(template.replace(DATE_PLACEHOLDER, today))
}

fn file_appender(path: &Path) -> tracing_appender::rolling::RollingFileAppender
{
    let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    tracing_appender::rolling::never(directory, path.file_name().unwrap_or_default())
}

fn init_logging_internal(format: LogFormat, env_filter: EnvFilter) -> Result<LoggingGuard, LoggingError>
{
    let log_file = env::var("REGMAP_LOG_FILE").ok().map(|template| log_file_path(&template));

    let (file_writer, guard) = match log_file.as_deref() {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path));
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let result = match format {
        LogFormat::Pretty => {
            let console_layer = fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_writer(io::stderr)
                .with_filter(env_filter.clone());

            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false) // No ANSI in files
                    .with_filter(env_filter)
            });

            Registry::default().with(console_layer).with(file_layer).try_init()
        }
        LogFormat::Json => {
            let console_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(io::stderr)
                .with_filter(env_filter.clone());

            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_filter(env_filter)
            });

            Registry::default().with(console_layer).with(file_layer).try_init()
        }
    };

    result.map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(LoggingGuard { _file: guard })
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// A global subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),
}
