use std::sync::Arc;

use futures::future::join_all;
use orx_model::{TaskHandle, TaskSpec};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{OrxError, ServiceError},
    service::JobService,
};

/// Creates remote tasks. Never retries: a repeated create could leave duplicate tasks behind.
pub struct JobLauncher {
    jobs: Arc<dyn JobService>,
}

/// Outcome of launching a whole batch.
#[derive(Debug, Default)]
pub struct LaunchReport {
    /// Successfully created tasks, in spec order.
    pub handles: Vec<TaskHandle>,
    /// One [`OrxError::LaunchError`] per label that could not be created, in spec order.
    pub failures: Vec<OrxError>,
}

impl JobLauncher {
    pub fn new(jobs: Arc<dyn JobService>) -> Self {
        Self { jobs }
    }

    #[instrument(level = "debug", skip(self, spec), fields(label = %spec.label(), name = %spec.display_name()))]
    pub async fn launch(&self, spec: &TaskSpec) -> Result<TaskHandle, OrxError> {
        let launch_error = |cause: ServiceError| OrxError::LaunchError {
            label: spec.label().to_string(),
            cause,
        };

        let id = self.jobs.create(spec).await.map_err(launch_error)?;
        if id.is_empty() {
            return Err(launch_error(ServiceError::InvalidResponse(
                "service returned an empty task id".into(),
            )));
        }

        debug!(target: "orx.launch", id = %id, "task created");
        Ok(TaskHandle::new(spec.label(), id))
    }

    /// Launch every spec concurrently.
    ///
    /// A failed label does not stop the others; the caller decides what a partial launch means.
    pub async fn launch_all(&self, specs: &[TaskSpec]) -> LaunchReport {
        let outcomes = join_all(specs.iter().map(|spec| self.launch(spec))).await;

        let mut report = LaunchReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(handle) => {
                    info!(target: "orx.launch", label = %handle.label, id = %handle.id, "task launched");
                    report.handles.push(handle);
                }
                Err(e) => {
                    warn!(target: "orx.launch", error = %e, "task launch failed");
                    report.failures.push(e);
                }
            }
        }
        report
    }
}
