use tokio::net::TcpListener;

use protolab_ancestor::SharedAncestor;
use protolab_harness::ScenarioHarness;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// protolab HTTP server over one process-wide shared ancestor.
pub struct ProtolabServer {
    config: ServerConfig,
    ancestor: SharedAncestor,
}

impl ProtolabServer {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_ancestor(config, SharedAncestor::new())
    }

    pub fn with_ancestor(config: ServerConfig, ancestor: SharedAncestor) -> Self {
        Self { config, ancestor }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn ancestor(&self) -> &SharedAncestor {
        &self.ancestor
    }

    /// Build the router (useful for testing). Captures the baseline.
    pub fn router(&self) -> ServerResult<axum::Router> {
        let harness = ScenarioHarness::new(self.ancestor.clone(), self.config.harness_config())?;
        Ok(build_router(AppState::new(harness, self.config.clone())))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router()?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            mode = self.config.ancestor_mode.as_str(),
            guard = self.config.guard.enabled,
            "protolab server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
