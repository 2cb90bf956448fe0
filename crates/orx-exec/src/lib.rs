//! Subprocess-backed collaborators for `orx-core`.
//!
//! Every external system is reached through its command-line client: `coder` for tasks, `gh`
//! for repositories and pull requests, `bd` for issues and `git` for the local remote.

mod proc;
pub use proc::{Captured, ProcConfig, run_capture};

mod coder;
pub use coder::{CoderConfig, CoderJobService};

mod gh;
pub use gh::GhCodeHost;

mod beads;
pub use beads::BeadsIssueStore;

mod git;
pub use git::git_origin;

#[cfg(feature = "serve")]
mod serve;
#[cfg(feature = "serve")]
pub use serve::HttpServeProbe;
