use async_trait::async_trait;
use orx_core::{JobService, ServiceError};
use orx_model::{StatusReport, TaskId, TaskSpec};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::proc::{ProcConfig, run_capture};

/// How tasks are created on the Coder deployment.
#[derive(Clone, Debug)]
pub struct CoderConfig {
    pub program: String,
    pub template: String,
    pub preset: String,
    pub owner: String,
    pub org: Option<String>,
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            program: "coder".into(),
            template: String::new(),
            preset: "none".into(),
            owner: "me".into(),
            org: None,
        }
    }
}

impl CoderConfig {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Default::default()
        }
    }
}

/// [`JobService`] over the `coder task` subcommands.
#[derive(Clone, Debug)]
pub struct CoderJobService {
    cfg: CoderConfig,
}

impl CoderJobService {
    pub fn new(cfg: CoderConfig) -> Self {
        Self { cfg }
    }

    fn command<I, S>(&self, args: I) -> ProcConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcConfig::new(self.cfg.program.clone(), args)
    }

    fn create_args(&self, name: &str) -> Vec<String> {
        let mut args: Vec<String> = vec!["task".into(), "create".into()];
        if let Some(org) = &self.cfg.org {
            args.extend(["--org".into(), org.clone()]);
        }
        args.extend([
            "--template".into(),
            self.cfg.template.clone(),
            "--preset".into(),
            self.cfg.preset.clone(),
            "--name".into(),
            name.to_string(),
            "--owner".into(),
            self.cfg.owner.clone(),
            "--quiet".into(),
            "--stdin".into(),
        ]);
        args
    }

    /// Login of the authenticated Coder user.
    pub async fn who_am_i(&self) -> Result<String, ServiceError> {
        let out = run_capture(&self.command(["whoami"]), None).await?;
        Ok(out.stdout.trim().to_string())
    }

    /// Fail unless `name` appears in `coder templates list`.
    pub async fn ensure_template(&self, name: &str) -> Result<(), ServiceError> {
        let out = run_capture(&self.command(["templates", "list"]), None).await?;
        if out.stdout.split_whitespace().any(|word| word == name) {
            Ok(())
        } else {
            Err(ServiceError::Unavailable(format!("coder template not found: {name}")))
        }
    }
}

#[async_trait]
impl JobService for CoderJobService {
    #[instrument(level = "debug", skip(self, spec), fields(name = %spec.display_name()))]
    async fn create(&self, spec: &TaskSpec) -> Result<TaskId, ServiceError> {
        let cmd = self.command(self.create_args(spec.display_name()));
        let out = run_capture(&cmd, Some(spec.payload())).await?;
        let id = parse_task_id(&out.stdout).ok_or_else(|| {
            ServiceError::InvalidResponse(format!(
                "coder task create printed no task id for {}",
                spec.display_name()
            ))
        })?;
        debug!(target: "orx.exec", %id, "coder task created");
        Ok(id)
    }

    async fn status(&self, id: &TaskId) -> Result<StatusReport, ServiceError> {
        let out = run_capture(
            &self.command(["task", "status", id.as_str(), "-o", "json"]),
            None,
        )
        .await?;
        parse_status(&out.stdout)
    }

    async fn logs(&self, id: &TaskId) -> Result<String, ServiceError> {
        let out = run_capture(&self.command(["task", "logs", id.as_str()]), None).await?;
        Ok(out.stdout)
    }

    async fn delete(&self, id: &TaskId) -> Result<(), ServiceError> {
        run_capture(&self.command(["task", "delete", id.as_str(), "--yes"]), None).await?;
        Ok(())
    }
}

/// The id is the last non-empty line; `--quiet` still lets warnings through before it.
fn parse_task_id(stdout: &str) -> Option<TaskId> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(TaskId::from)
}

#[derive(Debug, Default, Deserialize)]
struct RawStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    current_state: Option<RawState>,
    #[serde(default)]
    workspace_name: Option<String>,
    #[serde(default)]
    workspace_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawState {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

/// Parse `coder task status -o json`, skipping any text printed before the JSON object.
fn parse_status(raw: &str) -> Result<StatusReport, ServiceError> {
    let json = raw.find('{').map_or(raw, |start| &raw[start..]).trim();
    let parsed: RawStatus = serde_json::from_str(json).map_err(|e| {
        ServiceError::InvalidResponse(format!("coder task status: {e}, body: {}", raw.trim()))
    })?;

    let state = parsed.current_state.unwrap_or_default();
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    Ok(StatusReport {
        overall_status: non_empty(parsed.status),
        sub_state: non_empty(state.state),
        message: state.message.unwrap_or_default(),
        artifact_uri: non_empty(state.uri),
        workspace_name: non_empty(parsed.workspace_name),
        workspace_status: non_empty(parsed.workspace_status),
    })
}
