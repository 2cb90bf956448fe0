//! Orchestration core: launch a batch of remote tasks, wait for all of them, merge their change
//! requests in a fixed order, verify the result and clean up.
//!
//! The collaborators (job service, code host, issue store, smoke probe) are traits in
//! [`service`]; subprocess-backed implementations live in `orx-exec`.

pub mod error;
pub use error::{CleanupWarning, OrxError, ServiceError};

pub mod config;
pub use config::{BuilderConfig, OrchestratorConfig};

pub mod clock;
pub use clock::{Clock, ManualClock, TokioClock};

pub mod service;
pub use service::{CodeHost, IssueStore, JobService, SmokeProbe};

pub mod batch;
pub use batch::Batch;

pub mod builder;
pub use builder::{TaskSpecBuilder, fetch_issues, normalize_repo, slugify};

pub mod extract;
pub use extract::{ChangeRequestRef, extract_from_logs, is_change_request, parse_change_request};

mod launcher;
pub use launcher::{JobLauncher, LaunchReport};

mod poller;
pub use poller::StatusPoller;

mod sequencer;
pub use sequencer::IntegrationSequencer;

mod verifier;
pub use verifier::{Checkout, Verifier};

mod reaper;
pub use reaper::Reaper;

mod orchestrator;
pub use orchestrator::{Orchestrator, RunFailure, RunOutcome, RunPlan, resolve_merge_order};

#[cfg(test)]
mod testing;
