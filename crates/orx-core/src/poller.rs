use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::future::join_all;
use orx_model::{BatchReport, ExtractedResult, StatusReport, TaskHandle, TaskState};
use tracing::{debug, info, instrument, warn};

use crate::{
    batch::Batch,
    clock::Clock,
    config::OrchestratorConfig,
    error::OrxError,
    extract::{extract_from_logs, is_change_request},
    service::JobService,
};

/// Waits for every task of a batch to reach a terminal state.
///
/// Polling happens in rounds: one status query per pending task, dispatched together, then
/// classified in launch order. Rounds are separated by a fixed sleep on the injected clock,
/// shortened to whatever is left before the deadline. A round still in flight when the deadline
/// passes is abandoned.
pub struct StatusPoller {
    jobs: Arc<dyn JobService>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    log_tail_lines: usize,
}

/// What one status snapshot means for a task.
enum Verdict {
    /// Not done; keep polling.
    Pending(TaskState),
    /// Done with an artifact.
    Complete { settled: TaskState, url: String },
}

impl StatusPoller {
    pub fn new(jobs: Arc<dyn JobService>, clock: Arc<dyn Clock>, cfg: &OrchestratorConfig) -> Self {
        Self {
            jobs,
            clock,
            interval: cfg.poll_interval,
            log_tail_lines: cfg.log_tail_lines,
        }
    }

    /// Poll until every handle in `batch` is complete.
    ///
    /// Fails with [`OrxError::TaskError`] as soon as one task errors or fails, without waiting
    /// for the rest, and with [`OrxError::BatchTimeout`] once `timeout` has passed with tasks
    /// still pending. Remote tasks are never cancelled here.
    #[instrument(level = "debug", skip(self, batch), fields(batch = %batch.id(), timeout_s = timeout.as_secs()))]
    pub async fn poll_all(
        &self,
        batch: &mut Batch,
        timeout: Duration,
    ) -> Result<BatchReport, OrxError> {
        let started = self.clock.now();
        let mut last_line: HashMap<String, String> = HashMap::new();

        loop {
            let pending = batch.pending();
            if pending.is_empty() {
                break;
            }

            let elapsed = self.clock.now().duration_since(started);
            if elapsed > timeout {
                return Err(give_up(batch, timeout));
            }

            let finished = tokio::select! {
                biased;
                outcome = self.round(batch, &pending, elapsed, &mut last_line) => Some(outcome),
                () = self.clock.sleep(timeout - elapsed) => None,
            };
            match finished {
                Some(outcome) => outcome?,
                None => return Err(give_up(batch, timeout)),
            }

            if batch.pending().is_empty() {
                break;
            }
            let left = timeout.saturating_sub(self.clock.now().duration_since(started));
            if left.is_zero() {
                return Err(give_up(batch, timeout));
            }
            self.clock.sleep(self.interval.min(left)).await;
        }

        Ok(batch.report())
    }

    /// Query every handle in `pending` once and fold the answers into `batch`.
    async fn round(
        &self,
        batch: &mut Batch,
        pending: &[TaskHandle],
        elapsed: Duration,
        last_line: &mut HashMap<String, String>,
    ) -> Result<(), OrxError> {
        let reports = join_all(pending.iter().map(|h| self.jobs.status(&h.id))).await;

        for (handle, report) in pending.iter().zip(reports) {
            let report = report.map_err(|e| OrxError::TaskError {
                label: handle.label.clone(),
                detail: format!("status query failed: {e}"),
            })?;

            let line = report.progress_line(&handle.label);
            if last_line.get(&handle.label) != Some(&line) {
                info!(target: "orx.poll", elapsed_s = elapsed.as_secs(), label = %handle.label, "{line}");
                last_line.insert(handle.label.clone(), line);
            }

            match self.judge(batch, handle, &report).await? {
                Verdict::Pending(state) => {
                    batch.advance(&handle.label, state);
                }
                Verdict::Complete { settled, url } => {
                    batch.advance(&handle.label, settled);
                    batch.advance(&handle.label, TaskState::Complete);
                    debug!(target: "orx.poll", label = %handle.label, %url, "task complete");
                    batch.record_result(ExtractedResult::new(handle.label.clone(), url));
                }
            }
        }
        Ok(())
    }

    /// Classify one snapshot. Terminal failures are recorded on the batch and returned as errors.
    async fn judge(
        &self,
        batch: &mut Batch,
        handle: &TaskHandle,
        report: &StatusReport,
    ) -> Result<Verdict, OrxError> {
        if report.is_service_error() {
            batch.advance(&handle.label, TaskState::Error);
            let workspace = report.workspace_name.as_deref().unwrap_or("<unknown>");
            let workspace_status = report.workspace_status.as_deref().unwrap_or("<unknown>");
            return Err(OrxError::TaskError {
                label: handle.label.clone(),
                detail: format!(
                    "task is in status=error (workspace={workspace}, workspace_status={workspace_status}); \
                     inspect via: coder ssh {workspace}"
                ),
            });
        }

        if report.sub_state_is("failure") {
            batch.advance(&handle.label, TaskState::Failure);
            let tail = match self.jobs.logs(&handle.id).await {
                Ok(text) => tail_lines(&text, self.log_tail_lines),
                Err(e) => format!("<logs unavailable: {e}>"),
            };
            return Err(OrxError::TaskError {
                label: handle.label.clone(),
                detail: format!("task entered failure state\n\nLogs (tail):\n{tail}"),
            });
        }

        let settled = if report.sub_state_is("idle") {
            TaskState::Idle
        } else if report.sub_state_is("complete") {
            TaskState::Running
        } else if report.sub_state.is_none() && !report_is_started(report) {
            return Ok(Verdict::Pending(TaskState::Submitted));
        } else {
            return Ok(Verdict::Pending(TaskState::Running));
        };

        if let Some(uri) = report.artifact()
            && is_change_request(uri)
        {
            return Ok(Verdict::Complete {
                settled,
                url: uri.to_string(),
            });
        }

        let state = report.sub_state.as_deref().unwrap_or_default();
        match self.jobs.logs(&handle.id).await {
            Ok(text) => match extract_from_logs(&text) {
                Some(url) => {
                    debug!(target: "orx.poll", label = %handle.label, "result recovered from logs");
                    Ok(Verdict::Complete { settled, url })
                }
                None => {
                    batch.advance(&handle.label, TaskState::Failure);
                    Err(OrxError::TaskError {
                        label: handle.label.clone(),
                        detail: format!("finished but no result found (state={state})"),
                    })
                }
            },
            Err(e) => {
                batch.advance(&handle.label, TaskState::Failure);
                Err(OrxError::TaskError {
                    label: handle.label.clone(),
                    detail: format!(
                        "finished but no result found (state={state}); logs unavailable: {e}"
                    ),
                })
            }
        }
    }
}

/// Mark every pending handle timed out and build the matching error.
fn give_up(batch: &mut Batch, timeout: Duration) -> OrxError {
    let labels: Vec<String> = batch.pending().into_iter().map(|h| h.label).collect();
    for label in &labels {
        batch.advance(label, TaskState::TimedOut);
    }
    warn!(target: "orx.poll", pending = ?labels, "deadline passed");
    OrxError::BatchTimeout {
        pending: labels,
        timeout,
    }
}

/// Whether the service reports the task as past its start-up phase.
fn report_is_started(report: &StatusReport) -> bool {
    !matches!(
        report
            .overall_status
            .as_deref()
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref(),
        None | Some("") | Some("pending") | Some("initializing")
    )
}

/// Last `n` lines of `text`, in order.
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
