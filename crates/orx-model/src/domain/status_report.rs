use serde::{Deserialize, Serialize};

/// One status snapshot of a remote task, normalized from whatever the job service returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Service-level status of the task (`"active"`, `"error"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_status: Option<String>,
    /// Agent-reported sub-state (`"working"`, `"idle"`, `"complete"`, `"failure"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_state: Option<String>,
    /// Free-text status message from the agent.
    #[serde(default)]
    pub message: String,
    /// Artifact the agent attached to its current state, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_status: Option<String>,
}

impl StatusReport {
    /// Returns `true` if the service itself flagged the task as broken.
    pub fn is_service_error(&self) -> bool {
        matches_ignore_case(self.overall_status.as_deref(), "error")
    }

    /// Case-insensitive comparison against the sub-state.
    pub fn sub_state_is(&self, expected: &str) -> bool {
        matches_ignore_case(self.sub_state.as_deref(), expected)
    }

    /// The artifact URI, treating an empty string as absent.
    pub fn artifact(&self) -> Option<&str> {
        self.artifact_uri
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Single progress line for operators: `"<label>: <state> <message>"`.
    pub fn progress_line(&self, label: &str) -> String {
        let state = self
            .sub_state
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("<no-state>");
        format!("{label}: {state} {}", self.message)
            .trim()
            .to_string()
    }
}

fn matches_ignore_case(value: Option<&str>, expected: &str) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_line_without_state_or_message() {
        let report = StatusReport::default();
        assert_eq!(report.progress_line("ui"), "ui: <no-state>");
    }

    #[test]
    fn progress_line_includes_message() {
        let report = StatusReport {
            sub_state: Some("working".into()),
            message: "writing index.html".into(),
            ..Default::default()
        };
        assert_eq!(report.progress_line("ui"), "ui: working writing index.html");
    }

    #[test]
    fn empty_artifact_is_absent() {
        let report = StatusReport {
            artifact_uri: Some("   ".into()),
            ..Default::default()
        };
        assert!(report.artifact().is_none());
    }

    #[test]
    fn service_error_is_case_insensitive() {
        let report = StatusReport {
            overall_status: Some("Error".into()),
            ..Default::default()
        };
        assert!(report.is_service_error());
        assert!(!StatusReport::default().is_service_error());
    }
}
