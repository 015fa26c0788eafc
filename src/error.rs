//! Error types for git-origins
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, missing repo, unresolvable commit-ish)
//! - 3: Merge conflict requiring manual resolution
//! - 4: Operation failed (git error, transport failure)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the git-origins CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const MERGE_CONFLICT: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for git-origins operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Repository not found from {0}")]
    RepoNotFound(PathBuf),

    #[error("Cannot resolve '{0}' to a commit")]
    Resolution(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Merge conflicts (exit code 3)
    #[error("Merge conflict in ledger entries: {}", .0.join(", "))]
    MergeConflict(Vec<String>),

    // Operation failures (exit code 4)
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("`{command}` failed: {stderr}")]
    Subprocess { command: String, stderr: String },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::RepoNotFound(_)
            | Error::Resolution(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            // Merge conflicts
            Error::MergeConflict(_) => exit_codes::MERGE_CONFLICT,

            // Operation failures
            Error::Git(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::Subprocess { .. }
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, when the error carries any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::MergeConflict(entries) => Some(serde_json::json!({ "entries": entries })),
            Error::Subprocess { command, stderr } => {
                Some(serde_json::json!({ "command": command, "stderr": stderr }))
            }
            _ => None,
        }
    }
}

/// Result type alias for git-origins operations
pub type Result<T> = std::result::Result<T, Error>;
