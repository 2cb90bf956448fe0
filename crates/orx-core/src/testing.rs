//! In-memory collaborators for unit tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use orx_model::{Issue, StatusReport, TaskId, TaskSpec, Visibility};

use crate::{
    error::ServiceError,
    service::{CodeHost, IssueStore, JobService, SmokeProbe},
};

pub fn running() -> StatusReport {
    StatusReport {
        overall_status: Some("active".into()),
        sub_state: Some("working".into()),
        message: "working on it".into(),
        ..Default::default()
    }
}

pub fn idle_with(uri: &str) -> StatusReport {
    StatusReport {
        overall_status: Some("active".into()),
        sub_state: Some("idle".into()),
        message: "opened pull request".into(),
        artifact_uri: Some(uri.into()),
        ..Default::default()
    }
}

pub fn complete_without_uri() -> StatusReport {
    StatusReport {
        overall_status: Some("active".into()),
        sub_state: Some("complete".into()),
        message: "done".into(),
        ..Default::default()
    }
}

pub fn failure() -> StatusReport {
    StatusReport {
        overall_status: Some("active".into()),
        sub_state: Some("failure".into()),
        message: "tests failed".into(),
        ..Default::default()
    }
}

pub fn service_error(workspace: &str) -> StatusReport {
    StatusReport {
        overall_status: Some("error".into()),
        workspace_name: Some(workspace.into()),
        workspace_status: Some("failed".into()),
        ..Default::default()
    }
}

/// Job service whose tasks follow scripted status sequences.
///
/// The id of a created task is `<label>-task`. Each status call pops the next scripted report;
/// the last one repeats forever. Unscripted tasks report [`running`].
#[derive(Default)]
pub struct FakeJobService {
    inner: Mutex<JobsInner>,
}

#[derive(Default)]
struct JobsInner {
    failing_creates: HashSet<String>,
    empty_ids: HashSet<String>,
    create_attempts: usize,
    created: Vec<String>,
    scripts: HashMap<TaskId, VecDeque<StatusReport>>,
    failing_status: HashSet<TaskId>,
    hanging_status: HashSet<TaskId>,
    logs: HashMap<TaskId, String>,
    failing_logs: HashSet<TaskId>,
    failing_deletes: HashSet<TaskId>,
    status_calls: Vec<TaskId>,
    log_calls: Vec<TaskId>,
    deleted: Vec<TaskId>,
}

impl FakeJobService {
    pub fn id_for(label: &str) -> TaskId {
        TaskId::from(format!("{label}-task"))
    }

    fn with(mut self, f: impl FnOnce(&mut JobsInner)) -> Self {
        f(self.inner.get_mut().unwrap_or_else(|e| e.into_inner()));
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JobsInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fail_create(self, label: &str) -> Self {
        self.with(|i| {
            i.failing_creates.insert(label.to_string());
        })
    }

    pub fn empty_id_for(self, label: &str) -> Self {
        self.with(|i| {
            i.empty_ids.insert(label.to_string());
        })
    }

    pub fn script(self, id: impl Into<TaskId>, reports: Vec<StatusReport>) -> Self {
        self.with(|i| {
            i.scripts.insert(id.into(), reports.into());
        })
    }

    pub fn fail_status(self, id: impl Into<TaskId>) -> Self {
        self.with(|i| {
            i.failing_status.insert(id.into());
        })
    }

    /// Status queries for `id` never answer.
    pub fn hang_status(self, id: impl Into<TaskId>) -> Self {
        self.with(|i| {
            i.hanging_status.insert(id.into());
        })
    }

    pub fn logs(self, id: impl Into<TaskId>, text: &str) -> Self {
        self.with(|i| {
            i.logs.insert(id.into(), text.to_string());
        })
    }

    pub fn fail_logs(self, id: impl Into<TaskId>) -> Self {
        self.with(|i| {
            i.failing_logs.insert(id.into());
        })
    }

    pub fn fail_delete(self, id: impl Into<TaskId>) -> Self {
        self.with(|i| {
            i.failing_deletes.insert(id.into());
        })
    }

    pub fn create_attempts(&self) -> usize {
        self.lock().create_attempts
    }

    pub fn created(&self) -> Vec<String> {
        self.lock().created.clone()
    }

    pub fn status_calls(&self) -> Vec<TaskId> {
        self.lock().status_calls.clone()
    }

    pub fn log_calls(&self) -> Vec<TaskId> {
        self.lock().log_calls.clone()
    }

    pub fn deleted(&self) -> Vec<TaskId> {
        self.lock().deleted.clone()
    }
}

#[async_trait]
impl JobService for FakeJobService {
    async fn create(&self, spec: &TaskSpec) -> Result<TaskId, ServiceError> {
        let mut inner = self.lock();
        inner.create_attempts += 1;
        if inner.failing_creates.contains(spec.label()) {
            return Err(ServiceError::NonZeroExit {
                program: "fake".into(),
                code: 1,
                detail: format!("template rejected {}", spec.label()),
            });
        }
        inner.created.push(spec.label().to_string());
        if inner.empty_ids.contains(spec.label()) {
            return Ok(TaskId::from(""));
        }
        Ok(Self::id_for(spec.label()))
    }

    async fn status(&self, id: &TaskId) -> Result<StatusReport, ServiceError> {
        let hangs = {
            let mut inner = self.lock();
            inner.status_calls.push(id.clone());
            inner.hanging_status.contains(id)
        };
        if hangs {
            std::future::pending::<()>().await;
        }
        let mut inner = self.lock();
        if inner.failing_status.contains(id) {
            return Err(ServiceError::Unavailable("status endpoint down".into()));
        }
        let Some(script) = inner.scripts.get_mut(id) else {
            return Ok(running());
        };
        let report = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        Ok(report.unwrap_or_else(running))
    }

    async fn logs(&self, id: &TaskId) -> Result<String, ServiceError> {
        let mut inner = self.lock();
        inner.log_calls.push(id.clone());
        if inner.failing_logs.contains(id) {
            return Err(ServiceError::Unavailable("log stream closed".into()));
        }
        Ok(inner.logs.get(id).cloned().unwrap_or_default())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), ServiceError> {
        let mut inner = self.lock();
        if inner.failing_deletes.contains(id) {
            return Err(ServiceError::NonZeroExit {
                program: "fake".into(),
                code: 1,
                detail: "task is busy".into(),
            });
        }
        inner.deleted.push(id.clone());
        Ok(())
    }
}

/// Code host that records merges and materializes a fixed file set on clone.
#[derive(Default)]
pub struct FakeCodeHost {
    inner: Mutex<HostInner>,
}

#[derive(Default)]
struct HostInner {
    failing_merges: HashSet<String>,
    merged: Vec<String>,
    clone_files: Vec<String>,
    clone_fails: bool,
    clones: Vec<String>,
}

impl FakeCodeHost {
    fn with(mut self, f: impl FnOnce(&mut HostInner)) -> Self {
        f(self.inner.get_mut().unwrap_or_else(|e| e.into_inner()));
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fail_merge(self, url: &str) -> Self {
        self.with(|i| {
            i.failing_merges.insert(url.to_string());
        })
    }

    pub fn clone_files(self, files: &[&str]) -> Self {
        self.with(|i| i.clone_files = files.iter().map(|f| f.to_string()).collect())
    }

    pub fn fail_clone(self) -> Self {
        self.with(|i| i.clone_fails = true)
    }

    pub fn merged(&self) -> Vec<String> {
        self.lock().merged.clone()
    }

    pub fn clones(&self) -> Vec<String> {
        self.lock().clones.clone()
    }
}

#[async_trait]
impl CodeHost for FakeCodeHost {
    async fn create_repo(
        &self,
        owner: &str,
        name: &str,
        _visibility: Visibility,
    ) -> Result<String, ServiceError> {
        Ok(format!("https://github.com/{owner}/{name}"))
    }

    async fn clone_repo(&self, identifier: &str, dest: &Path) -> Result<PathBuf, ServiceError> {
        let files = {
            let mut inner = self.lock();
            if inner.clone_fails {
                return Err(ServiceError::Unavailable("clone refused".into()));
            }
            inner.clones.push(identifier.to_string());
            inner.clone_files.clone()
        };
        std::fs::create_dir_all(dest)?;
        for file in files {
            std::fs::write(dest.join(file), "<html></html>")?;
        }
        Ok(dest.to_path_buf())
    }

    async fn merge_change(&self, url: &str) -> Result<(), ServiceError> {
        let mut inner = self.lock();
        if inner.failing_merges.contains(url) {
            return Err(ServiceError::NonZeroExit {
                program: "fake".into(),
                code: 1,
                detail: "merge conflict".into(),
            });
        }
        inner.merged.push(url.to_string());
        Ok(())
    }

    async fn who_am_i(&self) -> Result<String, ServiceError> {
        Ok("octo".into())
    }
}

#[derive(Default)]
pub struct FakeIssueStore {
    issues: HashMap<String, Issue>,
}

impl FakeIssueStore {
    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.insert(issue.id.clone(), issue);
        self
    }
}

#[async_trait]
impl IssueStore for FakeIssueStore {
    async fn get(&self, id: &str) -> Result<Issue, ServiceError> {
        self.issues
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::InvalidResponse(format!("no issue {id}")))
    }
}

/// Probe with a fixed answer that records the directories it was pointed at.
#[derive(Default)]
pub struct StaticProbe {
    failure: Option<String>,
    calls: Mutex<Vec<(PathBuf, Duration)>>,
}

impl StaticProbe {
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, Duration)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SmokeProbe for StaticProbe {
    async fn probe(&self, root: &Path, timeout: Duration) -> Result<(), ServiceError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((root.to_path_buf(), timeout));
        match &self.failure {
            Some(reason) => Err(ServiceError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}
