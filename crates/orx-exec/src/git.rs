use crate::proc::{ProcConfig, run_capture};

/// URL of the `origin` remote of the current directory, if there is one.
pub async fn git_origin() -> Option<String> {
    let cmd = ProcConfig::new("git", ["remote", "get-url", "origin"]);
    let out = run_capture(&cmd, None).await.ok()?;
    let url = out.stdout.trim();
    (!url.is_empty()).then(|| url.to_string())
}
