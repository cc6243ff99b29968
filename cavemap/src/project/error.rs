//! Error types for project files.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for project operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Errors that can occur while saving or loading a project.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Reading or writing the file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The payload is not valid project JSON.
    #[error("invalid project data: {0}")]
    Format(#[from] serde_json::Error),

    /// The file was written by a newer release.
    #[error("project format {found} is newer than supported {supported}")]
    VersionMismatch { found: String, supported: String },

    /// The version string is not semver.
    #[error("invalid project format version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// Rows reference parents that do not exist.
    #[error("corrupt project: {0}")]
    Corrupt(String),
}

impl ProjectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ProjectError::Io {
            path: path.into(),
            source,
        }
    }
}
