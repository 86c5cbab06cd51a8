use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::time::{LocalTime, UtcTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::config_directory;

const LOG_FILE_NAME: &str = "deskshell.log";
/// Filter directives checked before `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "DESKSHELL_LOG";

/// Controls where structured logs are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingDestination {
    /// JSON file plus human-readable stderr, for the CLI.
    FileAndStderr,
    /// JSON file only, for the windowed shell.
    FileOnly,
    /// Stderr only, for tests and ad-hoc tools.
    StderrOnly,
}

impl LoggingDestination {
    fn writes_file(self) -> bool {
        matches!(
            self,
            LoggingDestination::FileAndStderr | LoggingDestination::FileOnly
        )
    }

    fn writes_stderr(self) -> bool {
        !matches!(self, LoggingDestination::FileOnly)
    }
}

#[derive(Debug)]
struct LoggingGuards {
    _guard: Option<WorkerGuard>,
    log_path: Option<PathBuf>,
}

static LOGGING_STATE: OnceLock<LoggingGuards> = OnceLock::new();

/// Errors that can arise while standing up structured logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to prepare log directory: {0}")]
    Io(#[from] io::Error),
    #[error("invalid logging filter: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to install logging subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

pub fn log_directory() -> PathBuf {
    config_directory().join("logs")
}

/// Install the global structured logging subscriber.
///
/// The first call wins; subsequent calls are no-ops that return the resolved log file path.
pub fn init_logging(
    destination: LoggingDestination,
) -> Result<Option<&'static PathBuf>, LoggingError> {
    if LOGGING_STATE.get().is_none() {
        let guards = install_logging(destination)?;
        if let Err(guards) = LOGGING_STATE.set(guards) {
            drop(guards);
        }
    }

    Ok(current_log_path())
}

/// Returns the log file path selected during logging initialization (if any).
pub fn current_log_path() -> Option<&'static PathBuf> {
    LOGGING_STATE
        .get()
        .and_then(|guards| guards.log_path.as_ref())
}

fn install_logging(destination: LoggingDestination) -> Result<LoggingGuards, LoggingError> {
    let filter = build_filter()?;

    let mut guard = None;
    let mut log_path = None;
    let file_layer = if destination.writes_file() {
        let dir = log_directory();
        fs::create_dir_all(&dir)?;
        let file_appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
        let (writer, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);
        log_path = Some(dir.join(LOG_FILE_NAME));
        Some(
            tracing_subscriber::fmt::layer()
                .event_format(
                    tracing_subscriber::fmt::format()
                        .json()
                        .with_timer(UtcTime::rfc_3339())
                        .with_level(true)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with_writer(writer)
                .with_ansi(false),
        )
    } else {
        None
    };

    let stderr_layer = destination.writes_stderr().then(|| {
        tracing_subscriber::fmt::layer()
            .event_format(
                tracing_subscriber::fmt::format()
                    .with_timer(LocalTime::rfc_3339())
                    .with_level(true)
                    .with_target(true)
                    .with_ansi(false),
            )
            .with_writer(io::stderr)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    if let Some(path) = log_path.as_ref() {
        info!(path = %path.display(), "Structured logging enabled");
    }

    Ok(LoggingGuards {
        _guard: guard,
        log_path,
    })
}

fn build_filter() -> Result<EnvFilter, ParseError> {
    if let Ok(spec) = env::var(LOG_FILTER_ENV) {
        if !spec.trim().is_empty() {
            return EnvFilter::try_new(spec);
        }
    }

    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new("info"),
    }
}
