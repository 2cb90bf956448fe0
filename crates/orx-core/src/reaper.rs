use std::sync::Arc;

use orx_model::TaskHandle;
use tracing::{info, instrument, warn};

use crate::{error::CleanupWarning, service::JobService};

/// Best-effort deletion of remote tasks.
pub struct Reaper {
    jobs: Arc<dyn JobService>,
}

impl Reaper {
    pub fn new(jobs: Arc<dyn JobService>) -> Self {
        Self { jobs }
    }

    /// Delete every handle. A failed deletion becomes a warning and does not stop the others.
    #[instrument(level = "debug", skip_all, fields(count = handles.len()))]
    pub async fn reap(&self, handles: &[TaskHandle]) -> Vec<CleanupWarning> {
        let mut warnings = Vec::new();
        for handle in handles {
            match self.jobs.delete(&handle.id).await {
                Ok(()) => info!(target: "orx.reap", label = %handle.label, id = %handle.id, "task deleted"),
                Err(e) => {
                    let warning = CleanupWarning {
                        handle: handle.clone(),
                        cause: e.to_string(),
                    };
                    warn!(target: "orx.reap", "{warning}");
                    warnings.push(warning);
                }
            }
        }
        warnings
    }
}
