use std::{collections::HashSet, sync::Arc};

use orx_model::{BatchReport, Label, TaskHandle, TaskMap, TaskSpec};
use thiserror::Error;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    batch::Batch,
    clock::{Clock, TokioClock},
    config::OrchestratorConfig,
    error::{CleanupWarning, OrxError},
    launcher::JobLauncher,
    poller::StatusPoller,
    reaper::Reaper,
    sequencer::IntegrationSequencer,
    service::{CodeHost, JobService, SmokeProbe},
    verifier::{Checkout, Verifier},
};

/// What a full run does after every task has produced its artifact.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Repository the artifacts are merged into and verified from (`owner/name` or URL).
    pub repo: String,
    /// Merge order. Empty means spec order.
    pub merge_order: Vec<Label>,
    pub merge: bool,
    /// Only honoured when `merge` is set.
    pub verify: bool,
    /// Delete the remote tasks at the end, on success and on failure.
    pub reap: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub batch_id: Uuid,
    pub tasks: TaskMap,
    pub report: BatchReport,
    /// Change requests merged, in merge order.
    pub merged: Vec<String>,
    pub checkout: Option<Checkout>,
    pub warnings: Vec<CleanupWarning>,
}

/// A fatal pipeline error and the cleanup warnings collected while shutting the batch down.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: OrxError,
    pub warnings: Vec<CleanupWarning>,
}

impl From<OrxError> for RunFailure {
    fn from(error: OrxError) -> Self {
        Self {
            error,
            warnings: Vec::new(),
        }
    }
}

/// The launch, poll, merge, verify and reap pipeline over one batch.
pub struct Orchestrator {
    cfg: OrchestratorConfig,
    jobs: Arc<dyn JobService>,
    host: Arc<dyn CodeHost>,
    probe: Arc<dyn SmokeProbe>,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(
        cfg: OrchestratorConfig,
        jobs: Arc<dyn JobService>,
        host: Arc<dyn CodeHost>,
        probe: Arc<dyn SmokeProbe>,
    ) -> Self {
        Self {
            cfg,
            jobs,
            host,
            probe,
            clock: Arc::new(TokioClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Launch every spec of `batch` and record the handles that were created.
    ///
    /// On a partial launch the created handles stay recorded and the first failure is returned.
    pub async fn launch(&self, batch: &mut Batch) -> Result<(), OrxError> {
        let launched = JobLauncher::new(self.jobs.clone())
            .launch_all(batch.specs())
            .await;
        for handle in launched.handles {
            batch.record_handle(handle);
        }
        match launched.failures.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }

    /// Poll already launched tasks until they all finish.
    pub async fn wait(&self, batch: &mut Batch) -> Result<BatchReport, OrxError> {
        StatusPoller::new(self.jobs.clone(), self.clock.clone(), &self.cfg)
            .poll_all(batch, self.cfg.timeout)
            .await
    }

    pub async fn reap(&self, handles: &[TaskHandle]) -> Vec<CleanupWarning> {
        Reaper::new(self.jobs.clone()).reap(handles).await
    }

    /// Run the whole pipeline for `specs`.
    ///
    /// Any fatal error stops the pipeline at its stage. Tasks already launched are still reaped
    /// when the plan asks for it; the fatal error is returned along with the cleanup warnings.
    /// Labels, including those of an explicit merge order, are checked before anything launches.
    #[instrument(level = "debug", skip_all, fields(tasks = specs.len(), repo = %plan.repo))]
    pub async fn run(
        &self,
        specs: Vec<TaskSpec>,
        plan: &RunPlan,
    ) -> Result<RunOutcome, RunFailure> {
        let order = resolve_merge_order(&specs, &plan.merge_order)?;
        let mut batch = Batch::new(specs)?;
        info!(target: "orx.run", batch = %batch.id(), tasks = batch.specs().len(), "batch started");

        let staged = self.stages(&mut batch, plan, &order).await;

        let warnings = if plan.reap {
            self.reap(batch.handles()).await
        } else {
            Vec::new()
        };

        let (report, merged, checkout) = match staged {
            Ok(staged) => staged,
            Err(error) => {
                error!(target: "orx.run", batch = %batch.id(), %error, warnings = warnings.len(), "batch failed");
                return Err(RunFailure { error, warnings });
            }
        };

        info!(target: "orx.run", batch = %batch.id(), results = report.len(), merged = merged.len(), "batch finished");
        Ok(RunOutcome {
            batch_id: batch.id(),
            tasks: batch.task_map(),
            report,
            merged,
            checkout,
            warnings,
        })
    }

    async fn stages(
        &self,
        batch: &mut Batch,
        plan: &RunPlan,
        order: &[Label],
    ) -> Result<(BatchReport, Vec<String>, Option<Checkout>), OrxError> {
        self.launch(batch).await?;
        let report = self.wait(batch).await?;

        if !plan.merge {
            return Ok((report, Vec::new(), None));
        }
        let merged = IntegrationSequencer::new(self.host.clone())
            .apply(&report, order)
            .await?;

        if !plan.verify {
            return Ok((report, merged, None));
        }
        let checkout = Verifier::new(self.host.clone(), self.probe.clone(), self.cfg.smoke_timeout)
            .verify(&plan.repo, &self.cfg.required_files)
            .await?;

        Ok((report, merged, Some(checkout)))
    }
}

/// The labels to merge, in order. An empty `requested` order means spec order.
///
/// Every requested label must belong to `specs` and appear once.
pub fn resolve_merge_order(
    specs: &[TaskSpec],
    requested: &[Label],
) -> Result<Vec<Label>, OrxError> {
    if requested.is_empty() {
        return Ok(specs.iter().map(|s| s.label().to_string()).collect());
    }
    let known: HashSet<&str> = specs.iter().map(TaskSpec::label).collect();
    let mut seen = HashSet::with_capacity(requested.len());
    for label in requested {
        if !known.contains(label.as_str()) {
            return Err(OrxError::InvalidIssue(format!(
                "merge order names unknown label: {label}"
            )));
        }
        if !seen.insert(label.as_str()) {
            return Err(OrxError::InvalidIssue(format!(
                "merge order lists {label} more than once"
            )));
        }
    }
    Ok(requested.to_vec())
}
