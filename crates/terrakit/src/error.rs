//! Error types for terraform invocations.
//!
//! Every failure crosses the component boundary to the immediate caller.
//! Nothing here is retried; the payloads carry enough context to rebuild
//! what was run and why it failed.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of errors, used to pick user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The resolved terraform version does not match the required one
    Toolchain,
    /// terraform ran but exited with an unexpected code
    Invocation,
    /// terraform output that should be JSON could not be decoded
    Malformed,
    /// The executable, working directory or variables file is unusable
    Environment,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Toolchain => "Terraform version mismatch",
            Self::Invocation => "Terraform command failed",
            Self::Malformed => "Unexpected terraform output",
            Self::Environment => "Workspace environment problem",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Toolchain => "Install the required terraform version or relax required_version",
            Self::Invocation => "Inspect stderr above; partial progress is left in the workspace",
            Self::Malformed => "Check that the terraform binary supports -json output",
            Self::Environment => "Check the terraform path and workspace directory permissions",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while driving terraform.
#[derive(Debug, Error)]
pub enum Error {
    /// Resolved version differs from the version required at construction
    #[error("required version of terraform check failed: {found} != {required}")]
    ToolchainMismatch {
        /// Version the session was asked to enforce
        required: String,
        /// Version reported by the binary
        found: String,
    },

    /// Exit code differs from the expected one and was not ignored
    #[error("{message}")]
    InvocationFailed {
        /// Human readable summary including the command and stderr
        message: String,
        /// The command line that was run, without the executable
        command: String,
        /// Actual exit code (`-1` when killed by a signal)
        exit_code: i32,
        /// Exit code the caller expected
        expected_exit_code: i32,
        /// Captured, right-trimmed standard output
        stdout: String,
        /// Captured, right-trimmed standard error
        stderr: String,
        /// Workspace directory the command ran in
        working_directory: PathBuf,
    },

    /// Output that should be JSON failed to decode
    #[error("malformed JSON from `{command}`: {source}")]
    MalformedResult {
        /// The command whose output was decoded
        command: String,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// terraform could not be located
    #[error("terraform executable not found: {0}")]
    ExecutableNotFound(String),

    /// The child process could not be started
    #[error("failed to execute {executable}: {source}")]
    Spawn {
        /// Path of the executable that failed to start
        executable: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The autoloaded variables file could not be written
    #[error("failed to write variables file {path}: {source}")]
    VariablesFile {
        /// Path of the variables file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Workspace directory is missing or not a directory
    #[error("workspace directory not found: {0}")]
    WorkspaceNotFound(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ToolchainMismatch { .. } => ErrorCategory::Toolchain,
            Error::InvocationFailed { .. } => ErrorCategory::Invocation,
            Error::MalformedResult { .. } => ErrorCategory::Malformed,
            Error::ExecutableNotFound(_)
            | Error::Spawn { .. }
            | Error::VariablesFile { .. }
            | Error::WorkspaceNotFound(_) => ErrorCategory::Environment,
            _ => ErrorCategory::Other,
        }
    }

    /// Exit code of a failed invocation, if this is one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::InvocationFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Captured stderr of a failed invocation, if this is one.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Error::InvocationFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Result type for terraform operations.
pub type Result<T> = std::result::Result<T, Error>;
