use std::{sync::Arc, time::Duration};

use anyhow::Context;
use orx_core::{
    Batch, BuilderConfig, CleanupWarning, CodeHost, Orchestrator, OrchestratorConfig, Reaper, RunPlan, TaskSpecBuilder,
    fetch_issues, normalize_repo, resolve_merge_order,
};
use orx_exec::{
    BeadsIssueStore, CoderConfig, CoderJobService, GhCodeHost, HttpServeProbe, git_origin,
};
use orx_model::{BatchReport, RepoInfo, TaskHandle, TaskMap};
use time::{OffsetDateTime, macros::format_description};
use tracing::info;

use crate::cli::{Command, RunArgs, SpawnArgs, TaskArgs, WaitArgs};

pub async fn dispatch(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Prompt { issue, repo } => prompt(issue, repo).await,
        Command::Spawn(args) => spawn(args).await,
        Command::Wait(args) => wait(args).await,
        Command::Run(args) => run(args).await,
        Command::Reap { ids } => reap(ids).await,
    }
}

async fn prompt(issue: String, repo: Option<String>) -> anyhow::Result<()> {
    let repo = repo_info(repo).await;
    let specs = TaskSpecBuilder::default()
        .load(&BeadsIssueStore::default(), repo.as_ref(), &[issue])
        .await?;
    for spec in &specs {
        print!("{}", spec.payload());
    }
    Ok(())
}

async fn spawn(args: SpawnArgs) -> anyhow::Result<()> {
    // 1) Specs: every issue must be valid before anything is launched
    let repo = repo_info(args.repo).await;
    let specs = builder(&args.task)
        .load(&BeadsIssueStore::default(), repo.as_ref(), &args.issues)
        .await?;

    if args.dry_run {
        for spec in &specs {
            println!("\n--- {} ---", spec.label());
            print!("{}", spec.payload());
        }
        return Ok(());
    }

    // 2) Launch
    let jobs = CoderJobService::new(coder_config(&args.task, &args.owner));
    let orchestrator = orchestrator(OrchestratorConfig::default(), jobs, GhCodeHost::default());
    let mut batch = Batch::new(specs)?;
    let launched = orchestrator.launch(&mut batch).await;

    // Print what was created even on a partial launch so the ids are not lost.
    print_tasks(&batch.task_map(), args.json)?;
    launched?;
    Ok(())
}

async fn wait(args: WaitArgs) -> anyhow::Result<()> {
    let handles = args
        .tasks
        .into_iter()
        .map(|(label, id)| TaskHandle::new(label, id))
        .collect();
    let mut batch = Batch::from_handles(handles)?;

    let cfg = OrchestratorConfig::default()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_poll_interval(Duration::from_secs(args.interval));
    let orchestrator = orchestrator(
        cfg,
        CoderJobService::new(CoderConfig::default()),
        GhCodeHost::default(),
    );

    let report = orchestrator.wait(&mut batch).await?;
    print_report(&report, args.json)
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    // 1) Issues, validated before any remote side effect
    let issues = fetch_issues(&BeadsIssueStore::default(), &args.issues).await?;
    let builder = builder(&args.task);
    let draft = builder.build_batch(None, &issues)?;
    resolve_merge_order(&draft, &args.merge_order)?;

    // 2) Preflight
    let coder = CoderJobService::new(coder_config(&args.task, &args.task_owner));
    let gh = GhCodeHost::default();
    coder.who_am_i().await.context("coder is not logged in")?;
    gh.auth_status().await.context("gh is not logged in")?;
    coder.ensure_template(&args.task.template).await?;

    // 3) Repository
    let (repo_full, repo_url) = match &args.repo {
        Some(repo) => (repo.clone(), repo_web_url(repo)),
        None => {
            let owner = match &args.owner {
                Some(owner) => owner.clone(),
                None => gh.who_am_i().await?,
            };
            let name = args.name.clone().unwrap_or_else(default_repo_name);
            let url = gh.create_repo(&owner, &name, args.visibility()).await?;
            info!(target: "orx.run", %url, "repository created");
            (format!("{owner}/{name}"), url)
        }
    };

    // 4) Pipeline
    let specs = builder.build_batch(Some(&normalize_repo(&repo_url)), &issues)?;
    let cfg = OrchestratorConfig {
        required_files: args.required.clone(),
        ..OrchestratorConfig::default().with_timeout(Duration::from_secs(args.timeout))
    };
    let plan = RunPlan {
        repo: repo_full,
        merge_order: args.merge_order.clone(),
        merge: !args.no_merge,
        verify: !args.no_merge && !args.skip_verify,
        reap: !args.keep_tasks,
    };
    let outcome = match orchestrator(cfg, coder, gh).run(specs, &plan).await {
        Ok(outcome) => outcome,
        Err(failure) => {
            print_warnings(&failure.warnings);
            return Err(failure.error.into());
        }
    };

    // 5) Report
    print_report(&outcome.report, args.json)?;
    print_warnings(&outcome.warnings);
    if let Some(checkout) = outcome.checkout
        && args.keep_checkout
    {
        let path = checkout.keep();
        eprintln!("checkout kept at {}", path.display());
    }
    info!(target: "orx.run", batch = %outcome.batch_id, merged = outcome.merged.len(), repo = %repo_url, "done");
    Ok(())
}

async fn reap(ids: Vec<String>) -> anyhow::Result<()> {
    let handles: Vec<TaskHandle> = ids
        .iter()
        .map(|id| TaskHandle::new(id.clone(), id.as_str()))
        .collect();
    let reaper = Reaper::new(Arc::new(CoderJobService::new(CoderConfig::default())));
    print_warnings(&reaper.reap(&handles).await);
    Ok(())
}

fn orchestrator(cfg: OrchestratorConfig, jobs: CoderJobService, host: GhCodeHost) -> Orchestrator {
    Orchestrator::new(cfg, Arc::new(jobs), Arc::new(host), Arc::new(HttpServeProbe))
}

fn builder(task: &TaskArgs) -> TaskSpecBuilder {
    TaskSpecBuilder::new(BuilderConfig {
        name_prefix: task.name_prefix.clone(),
        ..Default::default()
    })
}

fn coder_config(task: &TaskArgs, owner: &str) -> CoderConfig {
    CoderConfig {
        template: task.template.clone(),
        preset: task.preset.clone(),
        owner: owner.to_string(),
        org: task.org.clone(),
        ..Default::default()
    }
}

async fn repo_info(repo: Option<String>) -> Option<RepoInfo> {
    let remote = match repo {
        Some(repo) => Some(repo),
        None => git_origin().await,
    };
    remote.map(|r| normalize_repo(&r))
}

/// `owner/name` shorthand becomes a GitHub URL; anything else is taken as given.
fn repo_web_url(repo: &str) -> String {
    if repo.contains("://") || repo.starts_with("git@") {
        repo.to_string()
    } else {
        format!("https://github.com/{repo}")
    }
}

fn default_repo_name() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let stamp = now
        .format(format_description!("[year][month][day]-[hour][minute][second]"))
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    format!("orx-batch-{stamp}")
}

fn print_report(report: &BatchReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for (label, url) in report.iter() {
            println!("{label}\t{url}");
        }
    }
    Ok(())
}

fn print_tasks(tasks: &TaskMap, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tasks)?);
    } else {
        for (label, id) in tasks.iter() {
            println!("{label}\t{id}");
        }
    }
    Ok(())
}

fn print_warnings(warnings: &[CleanupWarning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_repo_becomes_github_url() {
        assert_eq!(repo_web_url("acme/todo"), "https://github.com/acme/todo");
        assert_eq!(
            repo_web_url("https://git.example.com/acme/todo"),
            "https://git.example.com/acme/todo"
        );
        assert_eq!(repo_web_url("git@github.com:acme/todo.git"), "git@github.com:acme/todo.git");
    }

    #[test]
    fn default_repo_name_is_timestamped() {
        let name = default_repo_name();
        let stamp = name.strip_prefix("orx-batch-").unwrap();
        assert_eq!(stamp.len(), "20260101-120000".len());
        assert_eq!(stamp.as_bytes()[8], b'-');
    }

    #[test]
    fn coder_config_carries_task_flags() {
        let task = TaskArgs {
            template: "agent".into(),
            preset: "fast".into(),
            org: Some("acme".into()),
            name_prefix: "orx-".into(),
        };
        let cfg = coder_config(&task, "octo");
        assert_eq!(cfg.program, "coder");
        assert_eq!(cfg.owner, "octo");
        assert_eq!(cfg.org.as_deref(), Some("acme"));
    }
}
