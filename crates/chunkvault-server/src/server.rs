use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use chunkvault_gate::AdmissionController;
use chunkvault_store::DiskContentStore;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::service::IngestionService;

/// chunkvault server: the ingestion service bound to an HTTP listener.
pub struct ChunkvaultServer {
    config: ServerConfig,
    service: Arc<IngestionService>,
}

impl ChunkvaultServer {
    /// Validate `config`, open the store and build the gates.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let store = DiskContentStore::open(&config.storage_root)?;
        let gates = AdmissionController::new(&config.gates)?;
        let service = IngestionService::new(Arc::new(store), gates, config.max_payload_size)
            .with_default_timeout(config.call_timeout());
        Ok(Self {
            config,
            service: Arc::new(service),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<IngestionService> {
        &self.service
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.service))
    }

    /// Serve until the process is killed.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then let in-flight calls finish.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %listener.local_addr()?,
            root = %self.config.storage_root.display(),
            "chunkvault server listening"
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
