//! Error types for the Pages deployment orchestrator.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures raised while running an external program.
///
/// A non-zero exit status is not a `ProcessError`; callers inspect
/// [`crate::process::ExecOutput`] for that.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Program not found: {program}")]
    NotFound { program: String },

    #[error("{program} exceeded timeout of {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("Failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Link store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Link store I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Link store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid link record: {0}")]
    InvalidRecord(String),
}

/// Operation failures surfaced to the user.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("{0}")]
    Validation(String),

    #[error("No project is linked. Create or link a project first.")]
    NotLinked,

    #[error("Install failed: {0}")]
    InstallFailed(String),

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Failed to create project: {0}")]
    CreateFailed(String),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Build succeeded but \"{dir}\" folder was not created. {hint}")]
    OutputDirMissing { dir: String, hint: String },

    #[error("Deploy failed: {0}")]
    DeployFailed(String),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Deployment machine has been disposed")]
    Disposed,
}

impl From<config::ConfigError> for DeployError {
    fn from(err: config::ConfigError) -> Self {
        DeployError::Config(err.to_string())
    }
}
