use std::{path::Path, time::Duration};

use async_trait::async_trait;
use axum::Router;
use orx_core::{ServiceError, SmokeProbe};
use tokio::{net::TcpListener, task::AbortHandle};
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::debug;

/// Serves a directory on an ephemeral loopback port and fetches `/` once.
#[derive(Clone, Debug, Default)]
pub struct HttpServeProbe;

/// Stops the server on every exit path of [`HttpServeProbe::probe`].
struct ServerGuard {
    token: CancellationToken,
    task: AbortHandle,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}

#[async_trait]
impl SmokeProbe for HttpServeProbe {
    async fn probe(&self, root: &Path, timeout: Duration) -> Result<(), ServiceError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = Router::new().fallback_service(ServeDir::new(root));
        let token = CancellationToken::new();
        let shutdown = token.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        });
        let _guard = ServerGuard {
            token,
            task: server.abort_handle(),
        };

        let url = format!("http://{addr}/");
        debug!(target: "orx.verify", %url, root = %root.display(), "serving checkout");

        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| ServiceError::Unavailable(format!("http client: {e}")))?;

        let response = tokio::time::timeout(timeout, client.get(&url).send())
            .await
            .map_err(|_| {
                ServiceError::Unavailable(format!(
                    "no response from {url} within {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| ServiceError::Unavailable(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Unavailable(format!("GET {url} returned {status}")));
        }
        Ok(())
    }
}
