use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a launched task as seen by the poller.
///
/// ```text
/// Submitted -> {Running, Idle} -> {Complete, Failure, Error} | TimedOut
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskState {
    /// Created on the service, not yet observed.
    Submitted,
    /// Service reports the task is still working.
    Running,
    /// Service reports the agent went quiet; a result is expected.
    Idle,
    /// Finished with an artifact.
    Complete,
    /// The task itself gave up.
    Failure,
    /// The service (workspace, agent runtime) broke.
    Error,
    /// Still not terminal when the batch deadline passed.
    TimedOut,
}

impl TaskState {
    /// Returns `true` if the state is final and the handle must not be polled again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Complete | TaskState::Failure | TaskState::Error | TaskState::TimedOut
        )
    }

    /// Position in the lifecycle partial order.
    ///
    /// `Running` and `Idle` share a rank, as do all terminal states.
    pub fn rank(&self) -> u8 {
        match self {
            TaskState::Submitted => 0,
            TaskState::Running | TaskState::Idle => 1,
            TaskState::Complete | TaskState::Failure | TaskState::Error | TaskState::TimedOut => 2,
        }
    }

    /// Whether moving from `self` to `next` respects the lifecycle.
    ///
    /// Staying put is allowed for non-terminal states (a task can report `running` for many
    /// rounds). Nothing leaves a terminal state, and no state goes back down in rank. Sideways
    /// moves between `Running` and `Idle` are allowed since the service can flip between them.
    pub fn can_advance_to(&self, next: TaskState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Running => "running",
            TaskState::Idle => "idle",
            TaskState::Complete => "complete",
            TaskState::Failure => "failure",
            TaskState::Error => "error",
            TaskState::TimedOut => "timedOut",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
