use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tempfile::TempDir;
use tracing::{debug, info, instrument};

use crate::{
    error::OrxError,
    service::{CodeHost, SmokeProbe},
};

/// Local clone of the integrated repository.
///
/// The directory is removed when the checkout is dropped unless [`Checkout::keep`] is called.
#[derive(Debug)]
pub struct Checkout {
    dir: TempDir,
    path: PathBuf,
}

impl Checkout {
    /// Root of the cloned repository.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop tracking the directory for removal and return the repository path.
    pub fn keep(self) -> PathBuf {
        let _ = self.dir.keep();
        self.path
    }
}

/// Post-integration check: clone, look for required files, serve and fetch once.
pub struct Verifier {
    host: Arc<dyn CodeHost>,
    probe: Arc<dyn SmokeProbe>,
    smoke_timeout: Duration,
}

impl Verifier {
    pub fn new(host: Arc<dyn CodeHost>, probe: Arc<dyn SmokeProbe>, smoke_timeout: Duration) -> Self {
        Self {
            host,
            probe,
            smoke_timeout,
        }
    }

    #[instrument(level = "debug", skip(self, required), fields(required = required.len()))]
    pub async fn verify(&self, repo: &str, required: &[String]) -> Result<Checkout, OrxError> {
        let dir = tempfile::Builder::new()
            .prefix("orx-verify-")
            .tempdir()
            .map_err(|e| OrxError::SmokeCheckFailed {
                reason: format!("cannot create checkout dir: {e}"),
            })?;

        let dest = dir.path().join("repo");
        let path = self
            .host
            .clone_repo(repo, &dest)
            .await
            .map_err(|e| OrxError::SmokeCheckFailed {
                reason: format!("clone of {repo} failed: {e}"),
            })?;
        debug!(target: "orx.verify", path = %path.display(), "repository cloned");

        for name in required {
            required_file(name, tokio::fs::try_exists(path.join(name)).await)?;
        }

        self.probe
            .probe(&path, self.smoke_timeout)
            .await
            .map_err(|e| OrxError::SmokeCheckFailed {
                reason: e.to_string(),
            })?;

        info!(target: "orx.verify", %repo, "verification passed");
        Ok(Checkout { dir, path })
    }
}

/// Turn an existence check on a required file into its verification outcome.
///
/// Only a definite "absent" is a missing artifact; a check that could not be made fails the
/// smoke check with the I/O cause.
fn required_file(name: &str, exists: io::Result<bool>) -> Result<(), OrxError> {
    match exists {
        Ok(true) => Ok(()),
        Ok(false) => Err(OrxError::MissingArtifact {
            name: name.to_string(),
        }),
        Err(e) => Err(OrxError::SmokeCheckFailed {
            reason: format!("cannot check {name}: {e}"),
        }),
    }
}
