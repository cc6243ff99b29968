//! Error types for survey import.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that can occur while importing a survey from a device or file.
///
/// All of these are scoped to one import and can be retried.
#[derive(Debug, Error)]
pub enum ImportError {
    /// No serial device matched the configured patterns.
    #[error("no Mnemo device found (searched: {})", .patterns.join(", "))]
    DeviceNotFound { patterns: Vec<String> },

    /// The device produced no bytes within the poll budget.
    #[error("no data received from {} after {cycles} poll cycles", .path.display())]
    NoDataFromDevice { path: PathBuf, cycles: u32 },

    /// The serial port exists but cannot be opened by this user.
    #[error("permission denied opening serial port {}", .path.display())]
    SerialPortPermission { path: PathBuf },

    /// The read was cancelled before any bytes arrived.
    #[error("device read aborted")]
    Aborted,

    /// A device search pattern is not a valid glob.
    #[error("invalid device pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A dump file value is not a number in `-128..=255`.
    #[error("malformed dump file at value {index}: {reason}")]
    MalformedDumpFile { index: usize, reason: String },

    /// I/O failure on a file or device.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ImportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            ImportError::SerialPortPermission { path }
        } else {
            ImportError::Io { path, source }
        }
    }
}
