mod task_id;
pub use task_id::TaskId;

mod task_spec;
pub use task_spec::{TaskHandle, TaskSpec};

mod task_state;
pub use task_state::TaskState;

mod status_report;
pub use status_report::StatusReport;

mod issue;
pub use issue::Issue;

mod repo;
pub use repo::{RepoInfo, Visibility};

mod report;
pub use report::{BatchReport, ExtractedResult, TaskMap};

/// Batch-unique key of a task.
///
/// Labels identify a unit of work for the whole lifetime of a batch: they key the specs,
/// handles, states and results, and they fix the integration order.
pub type Label = String;
