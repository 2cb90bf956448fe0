use std::collections::{BTreeMap, HashMap, HashSet};

use orx_model::{BatchReport, ExtractedResult, Label, TaskHandle, TaskMap, TaskSpec, TaskState};
use tracing::warn;
use uuid::Uuid;

use crate::error::OrxError;

/// Everything tracked for one invocation: specs, handles, per-label state history and results.
///
/// A batch lives in memory only and is owned by exactly one pipeline run.
#[derive(Debug)]
pub struct Batch {
    id: Uuid,
    specs: Vec<TaskSpec>,
    /// Launch order; also the order handles are classified within a polling round.
    handles: Vec<TaskHandle>,
    /// Every state observed per label; the last entry is the current one.
    states: HashMap<Label, Vec<TaskState>>,
    results: BTreeMap<Label, ExtractedResult>,
}

impl Batch {
    /// Create a batch from freshly built specs. Labels must be unique.
    pub fn new(specs: Vec<TaskSpec>) -> Result<Self, OrxError> {
        ensure_unique(specs.iter().map(TaskSpec::label))?;
        Ok(Self {
            id: Uuid::new_v4(),
            specs,
            handles: Vec::new(),
            states: HashMap::new(),
            results: BTreeMap::new(),
        })
    }

    /// Rebuild tracking for tasks launched by an earlier invocation.
    pub fn from_handles(handles: Vec<TaskHandle>) -> Result<Self, OrxError> {
        ensure_unique(handles.iter().map(|h| h.label.as_str()))?;
        let mut batch = Self {
            id: Uuid::new_v4(),
            specs: Vec::new(),
            handles: Vec::new(),
            states: HashMap::new(),
            results: BTreeMap::new(),
        };
        for handle in handles {
            batch.record_handle(handle);
        }
        Ok(batch)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn specs(&self) -> &[TaskSpec] {
        &self.specs
    }

    pub fn handles(&self) -> &[TaskHandle] {
        &self.handles
    }

    /// Start tracking a launched task in state [`TaskState::Submitted`].
    pub fn record_handle(&mut self, handle: TaskHandle) {
        self.states
            .insert(handle.label.clone(), vec![TaskState::Submitted]);
        self.handles.push(handle);
    }

    pub fn state(&self, label: &str) -> Option<TaskState> {
        self.states.get(label).and_then(|h| h.last().copied())
    }

    /// States observed for `label`, oldest first. Repeats of the same state are collapsed.
    pub fn history(&self, label: &str) -> &[TaskState] {
        self.states.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Move `label` to `next` if the lifecycle allows it.
    ///
    /// Returns `false` (and leaves the state untouched) for unknown labels and for transitions
    /// that would leave a terminal state or go backwards.
    pub fn advance(&mut self, label: &str, next: TaskState) -> bool {
        let Some(history) = self.states.get_mut(label) else {
            warn!(target: "orx.poll", label, state = %next, "state for unknown label ignored");
            return false;
        };
        let current = history.last().copied().unwrap_or(TaskState::Submitted);
        if !current.can_advance_to(next) {
            warn!(target: "orx.poll", label, from = %current, to = %next, "state regression ignored");
            return false;
        }
        if current != next {
            history.push(next);
        }
        true
    }

    /// Handles that have not reached a terminal state, in launch order.
    pub fn pending(&self) -> Vec<TaskHandle> {
        self.handles
            .iter()
            .filter(|h| !self.state(&h.label).is_some_and(|s| s.is_terminal()))
            .cloned()
            .collect()
    }

    /// Store the artifact of a completed task. A second result for the same label is rejected.
    pub fn record_result(&mut self, result: ExtractedResult) -> bool {
        if self.results.contains_key(&result.label) {
            warn!(target: "orx.poll", label = %result.label, "duplicate result ignored");
            return false;
        }
        self.results.insert(result.label.clone(), result);
        true
    }

    pub fn result(&self, label: &str) -> Option<&ExtractedResult> {
        self.results.get(label)
    }

    /// Sorted `label -> artifact URL` mapping of every result so far.
    pub fn report(&self) -> BatchReport {
        self.results.values().collect()
    }

    /// Sorted `label -> task id` mapping of every launched task.
    pub fn task_map(&self) -> TaskMap {
        TaskMap(
            self.handles
                .iter()
                .map(|h| (h.label.clone(), h.id.clone()))
                .collect(),
        )
    }
}

fn ensure_unique<'a>(labels: impl Iterator<Item = &'a str>) -> Result<(), OrxError> {
    let mut seen = HashSet::new();
    for label in labels {
        if label.trim().is_empty() {
            return Err(OrxError::InvalidIssue("empty label in batch".into()));
        }
        if !seen.insert(label) {
            return Err(OrxError::InvalidIssue(format!(
                "duplicate label in batch: {label}"
            )));
        }
    }
    Ok(())
}
