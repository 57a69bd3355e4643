use std::future::Future;
use std::sync::Arc;

use swap_store::RequestStore;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::router::build_router;
use crate::state::AppState;

/// Section Swap HTTP server.
///
/// Owns the store handle for the life of the process: the store is opened
/// before serving and closed once the server has shut down.
pub struct SwapServer {
    config: ServerConfig,
    store: Arc<dyn RequestStore>,
}

impl SwapServer {
    pub fn new(config: ServerConfig, store: Arc<dyn RequestStore>) -> Self {
        Self { config, store }
    }

    /// Open the store described by `config.storage`.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let store = config.storage.open()?;
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RequestStore> {
        &self.store
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(Arc::clone(&self.store)), &self.config)
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// Serve until `signal` resolves, then close the store.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("Section Swap server listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;
        tracing::info!("Section Swap server stopped");
        self.store.close()?;
        Ok(())
    }
}
