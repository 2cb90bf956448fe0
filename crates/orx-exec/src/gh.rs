use std::path::{Path, PathBuf};

use async_trait::async_trait;
use orx_core::{CodeHost, ServiceError, parse_change_request};
use orx_model::Visibility;
use tracing::debug;

use crate::proc::{ProcConfig, run_capture};

/// Variables that keep `gh` from prompting or drawing; set only when the caller has not.
const QUIET_ENV: [(&str, &str); 3] = [
    ("GH_PROMPT_DISABLED", "1"),
    ("GH_NO_UPDATE_NOTIFIER", "1"),
    ("GH_SPINNER_DISABLED", "1"),
];

/// [`CodeHost`] over the GitHub CLI.
#[derive(Clone, Debug)]
pub struct GhCodeHost {
    program: String,
    env: Vec<(String, String)>,
}

impl Default for GhCodeHost {
    fn default() -> Self {
        Self::new("gh")
    }
}

impl GhCodeHost {
    pub fn new(program: impl Into<String>) -> Self {
        let env = QUIET_ENV
            .iter()
            .filter(|(k, _)| std::env::var_os(k).is_none())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            program: program.into(),
            env,
        }
    }

    fn command<I, S>(&self, args: I) -> ProcConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcConfig::new(self.program.clone(), args).with_env(self.env.clone())
    }

    /// Fail unless `gh` is logged in.
    pub async fn auth_status(&self) -> Result<(), ServiceError> {
        run_capture(&self.command(["auth", "status"]), None).await?;
        Ok(())
    }
}

fn create_args(owner: &str, name: &str, visibility: Visibility) -> Vec<String> {
    vec![
        "repo".into(),
        "create".into(),
        format!("{owner}/{name}"),
        "--confirm".into(),
        "--add-readme".into(),
        format!("--{}", visibility.as_str()),
    ]
}

fn merge_args(url: &str) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "pr".into(),
        "merge".into(),
        url.into(),
        "--squash".into(),
        "--delete-branch".into(),
    ];
    if let Some(change) = parse_change_request(url) {
        args.extend(["--repo".into(), change.repo_full()]);
    }
    args
}

#[async_trait]
impl CodeHost for GhCodeHost {
    async fn create_repo(
        &self,
        owner: &str,
        name: &str,
        visibility: Visibility,
    ) -> Result<String, ServiceError> {
        run_capture(&self.command(create_args(owner, name, visibility)), None).await?;
        let url = format!("https://github.com/{owner}/{name}");
        debug!(target: "orx.exec", %url, %visibility, "repository created");
        Ok(url)
    }

    async fn clone_repo(&self, identifier: &str, dest: &Path) -> Result<PathBuf, ServiceError> {
        let dest_arg = dest.to_string_lossy().into_owned();
        run_capture(
            &self.command(["repo".to_string(), "clone".into(), identifier.into(), dest_arg]),
            None,
        )
        .await?;
        Ok(dest.to_path_buf())
    }

    async fn merge_change(&self, url: &str) -> Result<(), ServiceError> {
        run_capture(&self.command(merge_args(url)), None).await?;
        Ok(())
    }

    async fn who_am_i(&self) -> Result<String, ServiceError> {
        let out = run_capture(&self.command(["api", "user", "--jq", ".login"]), None).await?;
        let login = out.stdout.trim();
        if login.is_empty() {
            return Err(ServiceError::InvalidResponse(
                "unable to determine GitHub login via `gh api user`".into(),
            ));
        }
        Ok(login.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_uses_visibility_flag() {
        assert_eq!(
            create_args("octo", "orx-batch", Visibility::Public).join(" "),
            "repo create octo/orx-batch --confirm --add-readme --public"
        );
        assert!(create_args("octo", "x", Visibility::Private).contains(&"--private".to_string()));
    }

    #[test]
    fn merge_targets_repo_of_the_pull_request() {
        assert_eq!(
            merge_args("https://github.com/acme/todo/pull/12").join(" "),
            "pr merge https://github.com/acme/todo/pull/12 --squash --delete-branch --repo acme/todo"
        );
    }

    #[test]
    fn merge_without_recognizable_url_omits_repo() {
        assert!(!merge_args("12").iter().any(|a| a == "--repo"));
    }

    #[test]
    fn quiet_env_is_applied() {
        let host = GhCodeHost::default();
        for (k, _) in &host.env {
            assert!(QUIET_ENV.iter().any(|(q, _)| *q == k.as_str()));
        }
    }
}
