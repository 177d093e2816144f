//! geoproxy-server: geospatial forwarding proxy.
//!
//! Serves the bundled map front-end and forwards its parcel and layer
//! queries to GovMap and to allow-listed ArcGIS servers, keeping upstream
//! credentials on the server side.

mod config;
mod error;
mod routes;
mod server;
mod upstream;

use clap::Parser;
use config::{ConfigOverrides, ServerConfig};
use server::GeoProxyServer;
use std::path::PathBuf;
use tracing::{error, info};

/// geoproxy-server — GovMap / ArcGIS forwarding proxy
#[derive(Parser, Debug)]
#[command(name = "geoproxy-server", version, about = "GovMap / ArcGIS forwarding proxy")]
struct Cli {
    /// Listen port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Bind address
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// Directory of static front-end files
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<String>,

    /// GovMap API base URL
    #[arg(long, env = "GOVMAP_BASE_URL")]
    govmap_base_url: Option<String>,

    /// GovMap bearer token
    #[arg(long, env = "GOVMAP_TOKEN", hide_env_values = true)]
    govmap_token: Option<String>,

    /// Comma-separated ArcGIS hostnames callers may query
    #[arg(long, env = "ARCGIS_ALLOWED_HOSTS")]
    arcgis_allowed_hosts: Option<String>,

    /// ArcGIS layer listing endpoint
    #[arg(long, env = "ARCGIS_LAYERS_URL")]
    arcgis_layers_url: Option<String>,

    /// Upstream request timeout in seconds (default: none)
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS")]
    upstream_timeout_secs: Option<u64>,

    /// Config file path
    #[arg(long, default_value = "geoproxy.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            bind: self.bind.clone(),
            static_dir: self.static_dir.clone(),
            govmap_base_url: self.govmap_base_url.clone(),
            govmap_token: self.govmap_token.clone(),
            arcgis_allowed_hosts: self.arcgis_allowed_hosts.clone(),
            arcgis_layers_url: self.arcgis_layers_url.clone(),
            upstream_timeout_secs: self.upstream_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    use tracing_subscriber::EnvFilter;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting geoproxy-server");

    // Load server config (file + env/CLI overrides)
    let config_path = PathBuf::from(&cli.config);
    let server_config = match ServerConfig::load(Some(&config_path), cli.overrides()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let server = match GeoProxyServer::new(server_config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to create server");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run(shutdown_signal()).await {
        error!(error = %e, "server error");
        std::process::exit(1);
    }

    info!("geoproxy-server stopped");
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("received shutdown signal");
}
