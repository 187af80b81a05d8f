//! Error types for servoctl CLI

use openservo_output_filter::{FilterError, ProfileError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid profile {path}: {reason}")]
    ProfileInvalid { path: String, reason: String },

    #[error("Invalid trace at line {line}: {reason}")]
    TraceInvalid { line: usize, reason: String },

    #[error("Engine error: {0}")]
    Engine(#[from] FilterError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CliError {
    pub fn profile(path: &std::path::Path, err: &ProfileError) -> Self {
        CliError::ProfileInvalid {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ProfileInvalid { .. } | CliError::Engine(FilterError::Profile(_)) => 2,
            CliError::TraceInvalid { .. } => 3,
            _ => 1,
        }
    }
}
