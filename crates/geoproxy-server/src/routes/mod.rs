//! HTTP routes of the forwarding gateway.
//!
//! # Route table
//!
//! | Route                            | Upstream                                   |
//! |----------------------------------|--------------------------------------------|
//! | `GET  /api/govmap/address-to-parcel?q=` | GovMap `address-to-parcel?text=`    |
//! | `GET  /api/govmap/parcel?gush=&helka=`  | GovMap `parcel?gush=&helka=`        |
//! | `POST /api/govmap/intersect`     | GovMap `intersect` (JSON body)             |
//! | `GET  /api/arcgis/layers`        | fixed ArcGIS layers endpoint               |
//! | `POST /api/arcgis/query`         | `{layerUrl}/query` (allow-listed, form)    |
//! | `GET  /health`                   | none                                       |
//! | anything else                    | static front-end files                     |
//!
//! Proxy routes answer with the upstream body: JSON when it parses as JSON,
//! raw text otherwise.
//!
//! POST bodies are parsed only when sent as `application/json`; any other
//! content type reads as an empty object and the handler's own checks
//! decide the answer. Query strings are read pair by pair and never
//! rejected.

pub mod arcgis;
pub mod govmap;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::upstream::UpstreamClient;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRequest, Request};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use geoproxy_core::{GeoProxyResult, UpstreamBody};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Maximum accepted request body size (2 MB).
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>) -> GeoProxyResult<Self> {
        let upstream = UpstreamClient::new(config.upstream_timeout)?;
        Ok(Self { config, upstream })
    }

    /// GovMap bearer credential, when configured.
    pub fn govmap_token(&self) -> Option<&str> {
        self.config.govmap_token.as_deref()
    }
}

/// An upstream body relayed to the caller with status 200.
#[derive(Debug)]
pub struct Relay(pub UpstreamBody);

impl IntoResponse for Relay {
    fn into_response(self) -> Response {
        match self.0 {
            UpstreamBody::Json(value) => Json(value).into_response(),
            UpstreamBody::Text(text) => text.into_response(),
        }
    }
}

/// Untyped JSON request body.
///
/// Without an `application/json` content type, or with an empty body, this
/// is an empty object. Only objects and arrays are accepted at the top
/// level; anything else, and invalid JSON, is a 400.
#[derive(Debug)]
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(req.headers()) {
            return Ok(Self(Value::Object(Map::new())));
        }
        let bytes = Bytes::from_request(req, state).await?;
        parse_json_body(&bytes).map(Self)
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}

fn parse_json_body(bytes: &[u8]) -> Result<Value, ApiError> {
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        None => Ok(Value::Object(Map::new())),
        Some(b'{') | Some(b'[') => serde_json::from_slice(bytes)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}"))),
        Some(_) => Err(ApiError::BadRequest(
            "invalid JSON body: expected an object or array".to_string(),
        )),
    }
}

/// Build the gateway router: API routes, static fallback, CORS, body limit
/// and request tracing.
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/health", get(health))
        .route("/api/govmap/address-to-parcel", get(govmap::address_to_parcel))
        .route("/api/govmap/parcel", get(govmap::parcel_geometry))
        .route("/api/govmap/intersect", post(govmap::intersect))
        .route("/api/arcgis/layers", get(arcgis::list_layers))
        .route("/api/arcgis/query", post(arcgis::spatial_query))
        .with_state(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
