//! Narrow interfaces to the systems the orchestrator drives.
//!
//! Each trait is the complete capability set the core needs from that system. Implementations
//! map their own failures into [`ServiceError`]; the core maps those into batch errors.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use orx_model::{Issue, StatusReport, TaskId, TaskSpec, Visibility};

use crate::error::ServiceError;

/// Asynchronous remote execution service.
#[async_trait]
pub trait JobService: Send + Sync + 'static {
    /// Create a task from `spec` and return the id the service assigned.
    async fn create(&self, spec: &TaskSpec) -> Result<TaskId, ServiceError>;

    /// Current status snapshot of a task.
    async fn status(&self, id: &TaskId) -> Result<StatusReport, ServiceError>;

    /// Full log text of a task.
    async fn logs(&self, id: &TaskId) -> Result<String, ServiceError>;

    async fn delete(&self, id: &TaskId) -> Result<(), ServiceError>;
}

/// Remote repository host.
#[async_trait]
pub trait CodeHost: Send + Sync + 'static {
    /// Create `owner/name` and return its web URL.
    async fn create_repo(
        &self,
        owner: &str,
        name: &str,
        visibility: Visibility,
    ) -> Result<String, ServiceError>;

    /// Clone `identifier` into `dest` and return the checkout path.
    async fn clone_repo(&self, identifier: &str, dest: &Path) -> Result<PathBuf, ServiceError>;

    /// Merge the change request at `url` into its base branch.
    async fn merge_change(&self, url: &str) -> Result<(), ServiceError>;

    /// Login of the authenticated user.
    async fn who_am_i(&self) -> Result<String, ServiceError>;
}

/// Source of issue records.
#[async_trait]
pub trait IssueStore: Send + Sync + 'static {
    async fn get(&self, id: &str) -> Result<Issue, ServiceError>;
}

/// Serves a checked-out directory locally and fetches it once.
///
/// Implementations must release whatever they bind before returning, on every path.
#[async_trait]
pub trait SmokeProbe: Send + Sync + 'static {
    async fn probe(&self, root: &Path, timeout: Duration) -> Result<(), ServiceError>;
}
