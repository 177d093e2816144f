use thiserror::Error;

/// Errors produced by the geoproxy library and server.
#[derive(Debug, Error)]
pub enum GeoProxyError {
    #[error("unsupported geometry type: {0} (only Polygon supported)")]
    UnsupportedGeometry(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for GeoProxyError {
    fn from(e: serde_json::Error) -> Self {
        GeoProxyError::Other(format!("json error: {e}"))
    }
}

pub type GeoProxyResult<T> = Result<T, GeoProxyError>;
