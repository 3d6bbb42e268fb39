//! API server lifecycle: bind, spawn the axum server in the background,
//! return a handle with a shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::core_state::CoreState;

/// Handle to a running API server.
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
        if let Err(e) = self.task.await {
            tracing::error!("API server task failed: {e}");
        }
    }
}

/// Bind `addr` and serve the API router in a background task.
///
/// Port 0 binds an ephemeral port; `local_addr()` reports the real one.
pub async fn start_api_server(
    core: Arc<CoreState>,
    addr: SocketAddr,
) -> Result<ApiServer, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    let app = api_router(core);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    tracing::info!(%addr, "API server started");

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::pipeline::assistant::{MockCompletionClient, ReportAssistant};

    fn test_core() -> Arc<CoreState> {
        let assistant = ReportAssistant::new(
            Arc::new(MockCompletionClient::new("ok")),
            "analysis-model",
            "chat-model",
        );
        Arc::new(CoreState::with_assistant(Settings::default(), assistant))
    }

    #[tokio::test]
    async fn start_serve_and_stop() {
        let server = start_api_server(test_core(), SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("server should start");
        let addr = server.local_addr();
        assert!(addr.port() > 0);

        let url = format!("http://{addr}/api/health");
        let resp = reqwest::get(&url).await.unwrap();
        assert!(resp.status().is_success());
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "ok");

        server.shutdown().await;
        assert!(reqwest::get(&url).await.is_err());
    }

    #[tokio::test]
    async fn bind_conflict_is_an_error() {
        let first = start_api_server(test_core(), SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let second = start_api_server(test_core(), first.local_addr()).await;
        assert!(second.is_err());
        first.shutdown().await;
    }
}
