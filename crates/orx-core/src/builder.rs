//! Issue record -> task spec.
//!
//! Payloads are built by plain concatenation of fixed blocks so that the same issue always
//! produces the same bytes; launches can then be compared and dry runs trusted.

use std::collections::HashSet;

use orx_model::{Issue, RepoInfo, TaskSpec};
use tracing::{debug, instrument};
use url::Url;

use crate::{config::BuilderConfig, error::OrxError, service::IssueStore};

const PREAMBLE: &str = "You are a coding agent running inside a Coder Task workspace.";

const RULES: &str = "\n\nRules:\n\
- Follow the Beads spec exactly. Do ONLY the Must-Haves.\n\
- Do not add extra improvements; if you discover more work, create a new Beads issue and stop.\n\
- Work only in this repo.\n\
- Do not edit `.beads/*`.\n\
- Run the Verification commands from the spec and report results.\n";

#[derive(Debug, Clone, Default)]
pub struct TaskSpecBuilder {
    cfg: BuilderConfig,
}

impl TaskSpecBuilder {
    pub fn new(cfg: BuilderConfig) -> Self {
        Self { cfg }
    }

    /// Build the spec for one issue. The label is the issue id.
    pub fn build(&self, repo: Option<&RepoInfo>, issue: &Issue) -> Result<TaskSpec, OrxError> {
        let id = issue.id.trim();
        let description = issue.description.trim();
        let acceptance = issue.acceptance_criteria.trim();
        let title = match issue.title.trim() {
            "" => id,
            t => t,
        };

        if id.is_empty() {
            return Err(OrxError::InvalidIssue("issue id is missing".into()));
        }
        if description.is_empty() {
            return Err(OrxError::InvalidIssue(format!(
                "{id}: issue description is empty (cannot generate a safe prompt)"
            )));
        }

        let mut header: Vec<String> = Vec::new();
        if let Some(repo) = repo {
            if let Some(https) = &repo.https {
                header.push(format!("Repo: {https}"));
            }
            if let Some(ssh) = &repo.ssh {
                header.push(format!("RepoSSH: {ssh}"));
            }
            if header.is_empty() && !repo.raw.is_empty() {
                header.push(format!("Repo: {}", repo.raw));
            }
        }
        header.push(format!("Bead: {id}"));
        header.push(format!("Title: {title}"));
        let header = header.join("\n");
        let header = header.trim();

        let mut parts: Vec<String> = vec![PREAMBLE.to_string()];
        if !header.is_empty() {
            parts.push(String::new());
            parts.push(header.to_string());
        }
        parts.push(RULES.to_string());
        parts.push(format!("Beads Description:\n{description}"));
        if !acceptance.is_empty() {
            parts.push(format!("\nAcceptance Criteria:\n{acceptance}"));
        }

        let mut payload = parts.join("\n\n").trim_end().to_string();
        payload.push('\n');

        if payload.len() > self.cfg.max_payload_bytes {
            return Err(OrxError::InvalidIssue(format!(
                "{id}: payload is {} bytes (limit {})",
                payload.len(),
                self.cfg.max_payload_bytes
            )));
        }

        let display_name = slugify(&format!("{}{id}", self.cfg.name_prefix));
        Ok(TaskSpec::new(id, payload, display_name))
    }

    /// Build specs for several issues, refusing duplicate ids.
    pub fn build_batch(
        &self,
        repo: Option<&RepoInfo>,
        issues: &[Issue],
    ) -> Result<Vec<TaskSpec>, OrxError> {
        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(issues.len());
        for issue in issues {
            let spec = self.build(repo, issue)?;
            if !seen.insert(spec.label().to_string()) {
                return Err(OrxError::InvalidIssue(format!(
                    "duplicate issue id: {}",
                    spec.label()
                )));
            }
            specs.push(spec);
        }
        Ok(specs)
    }

    /// Fetch every issue from `store` and build its spec.
    pub async fn load(
        &self,
        store: &dyn IssueStore,
        repo: Option<&RepoInfo>,
        ids: &[String],
    ) -> Result<Vec<TaskSpec>, OrxError> {
        let issues = fetch_issues(store, ids).await?;
        self.build_batch(repo, &issues)
    }
}

/// Fetch issues in order.
///
/// Any store failure is reported as [`OrxError::InvalidIssue`]: nothing has been launched
/// yet, so the whole invocation is rejected as bad input.
#[instrument(level = "debug", skip(store), fields(count = ids.len()))]
pub async fn fetch_issues(store: &dyn IssueStore, ids: &[String]) -> Result<Vec<Issue>, OrxError> {
    let mut issues = Vec::with_capacity(ids.len());
    for id in ids {
        let issue = store
            .get(id)
            .await
            .map_err(|e| OrxError::InvalidIssue(format!("{id}: {e}")))?;
        debug!(target: "orx.build", id = %id, title = %issue.title, "issue loaded");
        issues.push(issue);
    }
    Ok(issues)
}

/// Derive HTTPS and SSH forms from a git remote.
///
/// Understands `git@host:owner/repo(.git)` and `http(s)://host/path(.git)`. Anything else is
/// passed through as [`RepoInfo::raw`] only.
pub fn normalize_repo(remote: &str) -> RepoInfo {
    let remote = remote.trim();

    if let Some(rest) = remote.strip_prefix("git@")
        && let Some((host, path)) = rest.split_once(':')
    {
        let path = path.trim_start_matches('/');
        let https = format!("https://{host}/{path}");
        return RepoInfo {
            raw: remote.to_string(),
            https: Some(strip_git_suffix(&https).to_string()),
            ssh: Some(remote.to_string()),
        };
    }

    if let Ok(url) = Url::parse(remote)
        && matches!(url.scheme(), "http" | "https")
        && let Some(host) = url.host_str()
    {
        let path = url.path().trim_start_matches('/');
        if !path.is_empty() {
            let authority = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            let https = format!("{}://{authority}/{path}", url.scheme());
            return RepoInfo {
                raw: remote.to_string(),
                https: Some(strip_git_suffix(&https).to_string()),
                ssh: Some(format!("git@{authority}:{path}")),
            };
        }
    }

    RepoInfo::raw_only(remote)
}

fn strip_git_suffix(s: &str) -> &str {
    s.strip_suffix(".git").unwrap_or(s)
}

/// Turn an arbitrary string into a task name: lower-case ASCII letters, digits and single dashes.
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let out = out.trim_matches('-');
    if out.is_empty() {
        "task".to_string()
    } else {
        out.to_string()
    }
}
