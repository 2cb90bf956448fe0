use async_trait::async_trait;
use orx_core::{IssueStore, ServiceError};
use orx_model::Issue;
use serde_json::Value;

use crate::proc::{ProcConfig, run_capture};

/// [`IssueStore`] over `bd show <id> --json`.
#[derive(Clone, Debug)]
pub struct BeadsIssueStore {
    program: String,
}

impl Default for BeadsIssueStore {
    fn default() -> Self {
        Self {
            program: "bd".into(),
        }
    }
}

impl BeadsIssueStore {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl IssueStore for BeadsIssueStore {
    async fn get(&self, id: &str) -> Result<Issue, ServiceError> {
        let cmd = ProcConfig::new(self.program.clone(), ["show", id, "--json"]);
        let out = run_capture(&cmd, None).await?;
        parse_show(id, &out.stdout)
    }
}

/// `bd show --json` prints an array; the first element is the issue.
fn parse_show(id: &str, raw: &str) -> Result<Issue, ServiceError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ServiceError::InvalidResponse(format!("bd show returned invalid JSON: {e}")))?;

    let first = match value {
        Value::Array(items) => items.into_iter().next(),
        _ => None,
    }
    .ok_or_else(|| ServiceError::InvalidResponse(format!("bd show returned empty result for {id}")))?;

    if !first.is_object() {
        return Err(ServiceError::InvalidResponse(format!(
            "bd show returned non-object issue for {id}"
        )));
    }
    serde_json::from_value(first)
        .map_err(|e| ServiceError::InvalidResponse(format!("bd show issue {id}: {e}")))
}
