use serde::{Deserialize, Serialize};

use crate::{Label, TaskId};

/// Instruction payload for one remote task.
///
/// Built once per label and consumed by the launcher. There are no setters: a spec that needs to
/// change is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    label: Label,
    payload: String,
    display_name: String,
}

impl TaskSpec {
    /// Assemble a spec. Callers are expected to have validated `payload` is non-empty.
    pub fn new(
        label: impl Into<Label>,
        payload: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
            display_name: display_name.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Name the remote task is created under.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// A launched task: the batch label together with the id the service assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    pub label: Label,
    pub id: TaskId,
}

impl TaskHandle {
    pub fn new(label: impl Into<Label>, id: impl Into<TaskId>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}
