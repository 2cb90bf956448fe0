use std::time::Duration;

use orx_model::{Label, TaskHandle};
use thiserror::Error;

/// Failure of a call into an external collaborator (job service, code host, issue store, probe).
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("missing command: {0}")]
    MissingProgram(String),
    #[error("{program} failed (exit {code}): {detail}")]
    NonZeroExit {
        program: String,
        code: i32,
        detail: String,
    },
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::Io(e.to_string())
    }
}

/// Fatal batch errors. Each one stops the pipeline at the stage that raised it.
#[derive(Error, Debug)]
pub enum OrxError {
    /// Bad input; raised before any remote call is made.
    #[error("invalid issue: {0}")]
    InvalidIssue(String),

    /// The job service refused or failed to create the task for `label`.
    #[error("launch failed for {label}: {cause}")]
    LaunchError {
        label: Label,
        #[source]
        cause: ServiceError,
    },

    /// A task reached a failure or error terminal state, or finished without a result.
    #[error("task {label} failed: {detail}")]
    TaskError { label: Label, detail: String },

    /// Some tasks were still running when the deadline passed.
    #[error("timed out after {}s waiting for: {}", .timeout.as_secs(), .pending.join(", "))]
    BatchTimeout {
        pending: Vec<Label>,
        timeout: Duration,
    },

    /// A merge step failed; later steps were not attempted.
    #[error("integration failed at {label}: {cause}")]
    IntegrationError { label: Label, cause: String },

    #[error("verification failed: missing {name}")]
    MissingArtifact { name: String },

    #[error("verification failed: smoke check: {reason}")]
    SmokeCheckFailed { reason: String },
}

impl OrxError {
    /// Process exit status for this error: `2` for rejected input, `1` for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            OrxError::InvalidIssue(_) => 2,
            _ => 1,
        }
    }
}

/// Non-fatal cleanup problem: the task is left behind on the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub handle: TaskHandle,
    pub cause: String,
}

impl std::fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not delete task {} ({}): {}",
            self.handle.label, self.handle.id, self.cause
        )
    }
}
