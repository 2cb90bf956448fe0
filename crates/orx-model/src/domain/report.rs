use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Label, TaskId};

/// Artifact recovered from a completed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedResult {
    pub label: Label,
    pub artifact_url: String,
}

impl ExtractedResult {
    pub fn new(label: impl Into<Label>, artifact_url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            artifact_url: artifact_url.into(),
        }
    }
}

/// Machine-readable `label -> artifact URL` mapping of a finished batch.
///
/// Keys are sorted so that two runs producing the same results print identical output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchReport(pub BTreeMap<Label, String>);

impl BatchReport {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Label, &String)> {
        self.0.iter()
    }
}

impl<'a> FromIterator<&'a ExtractedResult> for BatchReport {
    fn from_iter<I: IntoIterator<Item = &'a ExtractedResult>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|r| (r.label.clone(), r.artifact_url.clone()))
                .collect(),
        )
    }
}

/// `label -> task id` mapping printed after a launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskMap(pub BTreeMap<Label, TaskId>);

impl TaskMap {
    pub fn iter(&self) -> impl Iterator<Item = (&Label, &TaskId)> {
        self.0.iter()
    }
}
