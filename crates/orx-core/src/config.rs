use std::time::Duration;

/// Knobs of the orchestration pipeline.
///
/// Built once by the caller and handed to each component; nothing inside the core reads the
/// environment.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between two polling rounds.
    pub poll_interval: Duration,
    /// Overall deadline for every task of the batch to reach a terminal state.
    pub timeout: Duration,
    /// How many trailing log lines are attached to a task failure.
    pub log_tail_lines: usize,
    /// Upper bound for the local serve-and-fetch probe.
    pub smoke_timeout: Duration,
    /// Files that must exist in the integrated repository.
    pub required_files: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(20 * 60),
            log_tail_lines: 80,
            smoke_timeout: Duration::from_secs(3),
            required_files: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Settings for turning issues into task specs.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Prepended to the label before slugifying it into the remote task name.
    pub name_prefix: String,
    /// Payloads above this size are refused.
    pub max_payload_bytes: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            name_prefix: String::new(),
            max_payload_bytes: 64 * 1024,
        }
    }
}
