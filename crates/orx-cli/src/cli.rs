use clap::{Args, Parser, Subcommand, value_parser};
use orx_model::Visibility;
use orx_observe::{LoggerFormat, LoggerLevel};

#[derive(Parser, Debug)]
#[command(
    name = "orx",
    version,
    about = "Fan issues out to remote coding tasks and merge what they produce",
    long_about = None
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "DIRECTIVE",
        default_value = "info",
        help = "Log filter directive (`info`, `orx=debug`, ...)"
    )]
    pub log_level: LoggerLevel,

    #[arg(long, global = true, value_name = "FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the task payload generated for one issue.
    Prompt {
        issue: String,
        #[arg(long, value_name = "URL", help = "Repository URL (defaults to git origin)")]
        repo: Option<String>,
    },
    /// Launch one task per issue and print the task ids.
    Spawn(SpawnArgs),
    /// Resume waiting on tasks launched earlier.
    Wait(WaitArgs),
    /// Launch, wait, merge, verify and clean up.
    Run(RunArgs),
    /// Delete tasks. Failures are reported, never fatal.
    Reap {
        #[arg(required = true, value_name = "TASK_ID")]
        ids: Vec<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TaskArgs {
    #[arg(long, value_name = "NAME", help = "Coder task template")]
    pub template: String,
    #[arg(long, default_value = "none")]
    pub preset: String,
    #[arg(long, value_name = "ORG")]
    pub org: Option<String>,
    #[arg(long, default_value = "", value_name = "PREFIX", help = "Prefix for task names")]
    pub name_prefix: String,
}

#[derive(Args, Debug)]
pub struct SpawnArgs {
    #[arg(required = true, value_name = "ISSUE")]
    pub issues: Vec<String>,
    #[command(flatten)]
    pub task: TaskArgs,
    #[arg(long, default_value = "me", value_name = "USER", help = "Owner of the tasks")]
    pub owner: String,
    #[arg(long, value_name = "URL", help = "Repository URL (defaults to git origin)")]
    pub repo: Option<String>,
    #[arg(long, help = "Print payloads instead of launching")]
    pub dry_run: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WaitArgs {
    #[arg(required = true, value_name = "LABEL=TASK_ID", value_parser = parse_pair)]
    pub tasks: Vec<(String, String)>,
    #[arg(long, value_name = "SECS", default_value_t = 1200, value_parser = value_parser!(u64))]
    pub timeout: u64,
    #[arg(long, value_name = "SECS", default_value_t = 10, value_parser = value_parser!(u64).range(1..))]
    pub interval: u64,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(required = true, value_name = "ISSUE")]
    pub issues: Vec<String>,
    #[command(flatten)]
    pub task: TaskArgs,
    #[arg(long, default_value = "me", value_name = "USER", help = "Owner of the tasks")]
    pub task_owner: String,
    #[arg(
        long,
        value_name = "OWNER/REPO",
        value_parser = parse_repo,
        conflicts_with_all = ["owner", "name", "public"]
    )]
    pub repo: Option<String>,
    #[arg(long, value_name = "OWNER", help = "Owner of the created repository (defaults to gh login)")]
    pub owner: Option<String>,
    #[arg(long, value_name = "NAME", help = "Name of the created repository")]
    pub name: Option<String>,
    #[arg(long)]
    pub public: bool,
    #[arg(long, value_delimiter = ',', value_name = "LABELS")]
    pub merge_order: Vec<String>,
    #[arg(long, value_name = "SECS", default_value_t = 1200, value_parser = value_parser!(u64))]
    pub timeout: u64,
    #[arg(long)]
    pub no_merge: bool,
    #[arg(long)]
    pub skip_verify: bool,
    #[arg(long)]
    pub keep_tasks: bool,
    #[arg(long)]
    pub keep_checkout: bool,
    #[arg(long = "require", value_name = "FILE", help = "File that must exist after merging")]
    pub required: Vec<String>,
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn visibility(&self) -> Visibility {
        if self.public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((label, id)) if !label.trim().is_empty() && !id.trim().is_empty() => {
            Ok((label.trim().to_string(), id.trim().to_string()))
        }
        _ => Err(format!("expected LABEL=TASK_ID, got {raw:?}")),
    }
}

/// Existing repository for `run`: `OWNER/REPO`, a clone URL or an scp-style `git@` remote.
fn parse_repo(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.contains("://") || raw.starts_with("git@") {
        return Ok(raw.to_string());
    }
    match raw.split_once('/') {
        Some((owner, name))
            if !owner.is_empty()
                && !name.is_empty()
                && !name.contains('/')
                && !raw.contains(char::is_whitespace) =>
        {
            Ok(raw.to_string())
        }
        _ => Err(format!("--repo must be OWNER/REPO, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn wait_parses_pairs() {
        let cli = Cli::parse_from(["orx", "wait", "ui=t-1", "js=t-2", "--timeout", "30"]);
        let Command::Wait(args) = cli.command else {
            panic!("expected wait");
        };
        assert_eq!(
            args.tasks,
            vec![("ui".to_string(), "t-1".to_string()), ("js".to_string(), "t-2".to_string())]
        );
        assert_eq!(args.timeout, 30);
        assert_eq!(args.interval, 10);
    }

    #[test]
    fn malformed_pair_is_rejected() {
        assert!(Cli::try_parse_from(["orx", "wait", "ui"]).is_err());
        assert!(Cli::try_parse_from(["orx", "wait", "=t-1"]).is_err());
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::parse_from([
            "orx",
            "run",
            "td-1",
            "td-2",
            "--template",
            "agent",
            "--merge-order",
            "td-2,td-1",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.merge_order, vec!["td-2", "td-1"]);
        assert_eq!(args.task.preset, "none");
        assert_eq!(args.task_owner, "me");
        assert_eq!(args.visibility(), Visibility::Private);
        assert!(!args.no_merge);
    }

    #[test]
    fn repo_conflicts_with_creation_flags() {
        let parsed = Cli::try_parse_from([
            "orx", "run", "td-1", "--template", "agent", "--repo", "acme/todo", "--public",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn run_repo_must_name_owner_and_repo() {
        let run = |repo: &str| {
            Cli::try_parse_from(["orx", "run", "td-1", "--template", "agent", "--repo", repo])
        };
        for bad in ["acme", "acme/", "/todo", "acme/todo/extra", "acme/to do"] {
            let err = run(bad).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{bad}");
        }

        let Command::Run(args) = run("acme/todo").unwrap().command else {
            panic!("expected run");
        };
        assert_eq!(args.repo.as_deref(), Some("acme/todo"));
        assert!(run("https://github.com/acme/todo").is_ok());
        assert!(run("git@github.com:acme/todo.git").is_ok());
    }

    #[test]
    fn spawn_owner_defaults_to_me() {
        let cli = Cli::parse_from(["orx", "spawn", "td-1", "--template", "agent", "--dry-run"]);
        let Command::Spawn(args) = cli.command else {
            panic!("expected spawn");
        };
        assert_eq!(args.owner, "me");
        assert!(args.dry_run);
    }

    #[test]
    fn bad_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["orx", "--log-format", "xml", "reap", "t-1"]).is_err());
    }
}
