//! Server configuration: TOML file + environment/CLI overrides.
//!
//! Resolved once at startup into an immutable [`ServerConfig`] that the
//! gateway shares behind an `Arc`.

use geoproxy_core::{GeoProxyError, GeoProxyResult, HostAllowList, DEFAULT_ARCGIS_HOST};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Fixed ArcGIS endpoint listing the municipal map layers.
pub const DEFAULT_LAYERS_URL: &str =
    "https://gisn.tel-aviv.gov.il/arcgis/rest/services/IView2/MapServer/layers?f=json";

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub govmap: GovMapSection,
    #[serde(default)]
    pub arcgis: ArcGisSection,
    #[serde(default)]
    pub upstream: UpstreamSection,
}

/// `[server]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            static_dir: default_static_dir(),
        }
    }
}

/// `[govmap]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GovMapSection {
    #[serde(default = "default_govmap_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for GovMapSection {
    fn default() -> Self {
        Self {
            base_url: default_govmap_base_url(),
            token: None,
        }
    }
}

/// `[arcgis]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ArcGisSection {
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
    #[serde(default = "default_layers_url")]
    pub layers_url: String,
}

impl Default for ArcGisSection {
    fn default() -> Self {
        Self {
            allowed_hosts: default_allowed_hosts(),
            layers_url: default_layers_url(),
        }
    }
}

/// `[upstream]` section of the config TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamSection {
    /// Outbound request timeout in seconds. Absent = wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_port() -> u16 {
    3000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_static_dir() -> String {
    "public".to_string()
}
fn default_govmap_base_url() -> String {
    "https://www.govmap.gov.il/api".to_string()
}
fn default_allowed_hosts() -> Vec<String> {
    vec![DEFAULT_ARCGIS_HOST.to_string()]
}
fn default_layers_url() -> String {
    DEFAULT_LAYERS_URL.to_string()
}

/// Values taken from the environment or command line. `None` = not given.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub static_dir: Option<String>,
    pub govmap_base_url: Option<String>,
    pub govmap_token: Option<String>,
    /// Comma-separated hostnames.
    pub arcgis_allowed_hosts: Option<String>,
    pub arcgis_layers_url: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
}

/// Resolved server configuration (paths expanded, overrides applied).
#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
    pub static_dir: PathBuf,
    /// GovMap API base, without a trailing slash.
    pub govmap_base_url: String,
    pub govmap_token: Option<String>,
    pub allowed_hosts: HostAllowList,
    pub arcgis_layers_url: String,
    pub upstream_timeout: Option<Duration>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("bind", &self.bind)
            .field("static_dir", &self.static_dir)
            .field("govmap_base_url", &self.govmap_base_url)
            .field("govmap_token", &self.govmap_token.as_ref().map(|_| "<redacted>"))
            .field("allowed_hosts", &self.allowed_hosts)
            .field("arcgis_layers_url", &self.arcgis_layers_url)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_parts(ConfigFile::default(), ConfigOverrides::default())
    }
}

impl ServerConfig {
    /// Load config from TOML file, then apply overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> GeoProxyResult<Self> {
        let file_config = match config_path {
            Some(path) => {
                let expanded = expand_tilde(path);
                if expanded.exists() {
                    info!(path = %expanded.display(), "loading config file");
                    let content = std::fs::read_to_string(&expanded)?;
                    toml::from_str::<ConfigFile>(&content)
                        .map_err(|e| GeoProxyError::Config(format!("config parse error: {e}")))?
                } else {
                    info!(path = %expanded.display(), "config file not found, using defaults");
                    ConfigFile::default()
                }
            }
            None => ConfigFile::default(),
        };

        let config = Self::from_parts(file_config, overrides);
        config.validate()?;
        Ok(config)
    }

    fn from_parts(file: ConfigFile, overrides: ConfigOverrides) -> Self {
        let allowed_hosts = match overrides.arcgis_allowed_hosts {
            Some(csv) => HostAllowList::from_csv(&csv),
            None => HostAllowList::new(&file.arcgis.allowed_hosts),
        };
        let static_dir = overrides.static_dir.unwrap_or(file.server.static_dir);
        let base_url = overrides.govmap_base_url.unwrap_or(file.govmap.base_url);
        let token = overrides
            .govmap_token
            .or(file.govmap.token)
            .filter(|t| !t.is_empty());

        Self {
            port: overrides.port.unwrap_or(file.server.port),
            bind: overrides.bind.unwrap_or(file.server.bind),
            static_dir: expand_tilde_str(&static_dir),
            govmap_base_url: base_url.trim_end_matches('/').to_string(),
            govmap_token: token,
            allowed_hosts,
            arcgis_layers_url: overrides
                .arcgis_layers_url
                .unwrap_or(file.arcgis.layers_url),
            upstream_timeout: overrides
                .upstream_timeout_secs
                .or(file.upstream.timeout_secs)
                .map(Duration::from_secs),
        }
    }

    fn validate(&self) -> GeoProxyResult<()> {
        url::Url::parse(&self.govmap_base_url).map_err(|e| {
            GeoProxyError::Config(format!("invalid govmap base url {}: {e}", self.govmap_base_url))
        })?;
        url::Url::parse(&self.arcgis_layers_url).map_err(|e| {
            GeoProxyError::Config(format!("invalid arcgis layers url {}: {e}", self.arcgis_layers_url))
        })?;
        Ok(())
    }

    /// Full `host:port` bind string.
    pub fn bind_string(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// GovMap endpoint for `path` (no leading slash).
    pub fn govmap_url(&self, path: &str) -> String {
        format!("{}/{}", self.govmap_base_url, path)
    }
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    expand_tilde_str(&s)
}

fn expand_tilde_str(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}
