//! Logging setup.
//!
//! Installs a `tracing` subscriber with an [`EnvFilter`] (`RUST_LOG` wins
//! over the configured level), an optional stderr layer and an optional
//! daily-rolling file layer. File output is written from a background
//! thread; keep the returned [`LoggingGuard`] alive until exit so buffered
//! lines are flushed.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when neither config nor `RUST_LOG` sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log file prefix; the appender adds a date suffix.
pub const DEFAULT_LOG_FILE_PREFIX: &str = "cavemap.log";

/// Errors from logging setup.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("cannot create log directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Directory for rolling log files; `None` disables file output.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
    /// `EnvFilter` directive, e.g. `info` or `cavemap=debug`.
    pub level: String,
    /// Also log to stderr.
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: DEFAULT_LOG_FILE_PREFIX.to_string(),
            level: DEFAULT_LOG_LEVEL.to_string(),
            stderr: true,
        }
    }
}

impl LoggingConfig {
    /// Enables file output under `directory`.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Sets the filter directive.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Turns stderr output on or off.
    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }
}

/// Keeps the file writer alive.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Builds the filter, preferring `RUST_LOG` when set and valid.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidFilter {
        filter: level.to_string(),
        reason: e.to_string(),
    })
}

/// Installs the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = build_filter(&config.level)?;

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_timer(LocalTime::new(Rfc3339))
            .with_target(false)
    });

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            fs::create_dir_all(directory).map_err(|e| LoggingError::Io {
                path: directory.clone(),
                source: e,
            })?;
            let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::new(Rfc3339));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}
