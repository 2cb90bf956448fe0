use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier handed out by the job service when a task is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the service handed back nothing usable.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::TaskId;

    #[test]
    fn serializes_as_plain_string() {
        let id = TaskId::from("0b7e-task");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""0b7e-task""#);
        assert_eq!(id.to_string(), "0b7e-task");
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert!(TaskId::from("  \n").is_empty());
        assert!(!TaskId::from("t-1").is_empty());
    }
}
