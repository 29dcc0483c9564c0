//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the dupfind application.
///
/// - 0: Success
/// - 1: General error
/// - 3: Removal stopped after deleting some files
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// Partial removal: a deletion failed after others had succeeded.
    PartialRemoval = 3,
    /// Interrupted: the run was interrupted by the user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DF000",
            Self::GeneralError => "DF001",
            Self::PartialRemoval => "DF003",
            Self::Interrupted => "DF130",
        }
    }
}

/// Errors that carry their own exit code out of `run_app`.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// The user interrupted the run.
    #[error("Interrupted after removing {completed} file(s)")]
    Interrupted {
        /// Files removed before the interruption
        completed: usize,
    },

    /// A deletion failed after some files were already removed.
    #[error("Removal aborted after {completed} file(s): {reason}")]
    PartialRemoval {
        /// Files removed before the failure
        completed: usize,
        /// The failure
        reason: String,
    },
}

impl AppError {
    /// Exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Interrupted { .. } => ExitCode::Interrupted,
            Self::PartialRemoval { .. } => ExitCode::PartialRemoval,
        }
    }
}

/// Exit code for an error returned by `run_app`.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    err.downcast_ref::<AppError>()
        .map_or(ExitCode::GeneralError, AppError::exit_code)
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DF001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
