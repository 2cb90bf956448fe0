use std::{io::ErrorKind, process::Stdio};

use orx_core::ServiceError;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::trace;

/// One command-line invocation.
#[derive(Clone, Debug, Default)]
pub struct ProcConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment on top of the inherited one.
    pub env: Vec<(String, String)>,
}

impl ProcConfig {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// `program arg1 arg2 ...`, for diagnostics.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output of a successful invocation.
#[derive(Clone, Debug, Default)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

/// Run `cfg` to completion, optionally feeding `stdin`, and capture both output streams.
///
/// A program that cannot be found maps to [`ServiceError::MissingProgram`]; a non-zero exit to
/// [`ServiceError::NonZeroExit`] carrying stderr (or stdout when stderr is empty).
pub async fn run_capture(cfg: &ProcConfig, stdin: Option<&str>) -> Result<Captured, ServiceError> {
    trace!(target: "orx.exec", cmd = %cfg.display(), "spawn");

    let mut cmd = Command::new(&cfg.program);
    cmd.args(&cfg.args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (k, v) in &cfg.env {
        cmd.env(k, v);
    }

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound => ServiceError::MissingProgram(cfg.program.clone()),
        _ => ServiceError::Io(format!("spawn {}: {e}", cfg.program)),
    })?;

    let pipe = child.stdin.take();
    let feed = async move {
        if let (Some(mut pipe), Some(input)) = (pipe, stdin) {
            match pipe.write_all(input.as_bytes()).await {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e),
                _ => {}
            }
        }
        Ok::<(), std::io::Error>(())
    };
    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    fed?;
    let output = output?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let detail = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        return Err(ServiceError::NonZeroExit {
            program: cfg.display(),
            code: output.status.code().unwrap_or(-1),
            detail: detail.to_string(),
        });
    }

    trace!(target: "orx.exec", cmd = %cfg.program, bytes = stdout.len(), "exit success");
    Ok(Captured { stdout, stderr })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_feeds_stdin() {
        let cfg = ProcConfig::new("cat", Vec::<String>::new());
        let out = run_capture(&cfg, Some("hello\n")).await.unwrap();
        assert_eq!(out.stdout, "hello\n");
    }

    #[tokio::test]
    async fn missing_program_is_named() {
        let cfg = ProcConfig::new("orx-definitely-not-installed", ["--help"]);
        let err = run_capture(&cfg, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingProgram(p) if p == "orx-definitely-not-installed"));
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let cfg = ProcConfig::new("sh", ["-c", "echo out; echo boom >&2; exit 3"]);
        let err = run_capture(&cfg, None).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::NonZeroExit { code: 3, ref detail, .. } if detail == "boom"
        ));
    }

    #[test]
    fn display_joins_program_and_args() {
        let cfg = ProcConfig::new("gh", ["repo", "clone", "acme/todo"]);
        assert_eq!(cfg.display(), "gh repo clone acme/todo");
    }
}
