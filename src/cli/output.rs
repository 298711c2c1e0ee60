//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{DeployError, ProcessError};

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &DeployError) -> String {
    match e {
        DeployError::Process(inner @ ProcessError::NotFound { .. }) => {
            format!("{}. Is it installed and on your PATH?", inner)
        }
        other => other.to_string(),
    }
}

/// Process exit code for a failed command.
pub fn exit_code(e: &DeployError) -> i32 {
    match e {
        DeployError::Validation(_) | DeployError::Config(_) => 2,
        _ => 1,
    }
}
