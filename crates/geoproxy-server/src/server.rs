//! Core server: binds the listener and serves the gateway router until the
//! shutdown future resolves.

use crate::config::ServerConfig;
use crate::routes::{self, AppState};
use geoproxy_core::GeoProxyResult;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// The geoproxy server instance.
pub struct GeoProxyServer {
    /// Immutable configuration, shared with every request.
    config: Arc<ServerConfig>,
    state: AppState,
}

impl GeoProxyServer {
    /// Create a new server instance.
    pub fn new(config: ServerConfig) -> GeoProxyResult<Self> {
        let config = Arc::new(config);
        let state = AppState::new(config.clone())?;

        let mut hosts: Vec<&str> = config.allowed_hosts.hosts().collect();
        hosts.sort_unstable();
        info!(
            govmap = %config.govmap_base_url,
            govmap_auth = config.govmap_token.is_some(),
            arcgis_allowed_hosts = ?hosts,
            static_dir = %config.static_dir.display(),
            "gateway configured"
        );
        if config.allowed_hosts.is_empty() {
            warn!("ArcGIS allow-list is empty; every spatial query will be refused");
        }

        Ok(Self { config, state })
    }

    /// Bind and serve until `shutdown` completes.
    pub async fn run<F>(self, shutdown: F) -> GeoProxyResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_string();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(addr = %bind_addr, "geoproxy listening");

        axum::serve(listener, routes::router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
