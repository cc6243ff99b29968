//! CLI error type and exit codes.

use std::fmt;

use cavemap::cache::CacheError;
use cavemap::config::ConfigError;
use cavemap::mnemo::ImportError;
use cavemap::project::ProjectError;
use cavemap::provider::ProviderError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad or missing configuration / arguments.
    Config(String),
    /// Reading from the device or a dump file failed.
    Import(ImportError),
    /// Saving or loading a project failed.
    Project(ProjectError),
    /// The tile provider could not be set up.
    Provider(ProviderError),
    /// Tile cache operation failed.
    Cache(CacheError),
    /// The async runtime could not be started.
    Runtime(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Import(ImportError::Aborted) => 130,
            CliError::Import(_) => 3,
            CliError::Provider(_) => 4,
            CliError::Project(_) | CliError::Cache(_) | CliError::Runtime(_) => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Import(e) => write!(f, "Import failed: {}", e),
            CliError::Project(e) => write!(f, "Project error: {}", e),
            CliError::Provider(e) => write!(f, "Provider error: {}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Import(e) => Some(e),
            CliError::Project(e) => Some(e),
            CliError::Provider(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::Config(_) | CliError::Runtime(_) => None,
        }
    }
}

impl From<ImportError> for CliError {
    fn from(e: ImportError) -> Self {
        CliError::Import(e)
    }
}

impl From<ProjectError> for CliError {
    fn from(e: ProjectError) -> Self {
        CliError::Project(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}
