//! GovMap (government mapping API) routes.
//!
//! Thin pass-throughs: each route builds one request against the configured
//! GovMap base URL, attaches the bearer credential when one is configured,
//! and relays whatever comes back.

use super::{AppState, JsonBody, Relay};
use crate::error::ApiError;
use axum::extract::{RawQuery, State};
use serde::Serialize;
use serde_json::Value;

/// Value of `key` in a raw query string.
///
/// A missing key reads as empty and repeated keys are joined with `,`.
fn query_value(raw: Option<&str>, key: &str) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Body of a spatial intersect request, forwarded to GovMap with only the
/// `wkt` and `layer` members the caller sent.
#[derive(Debug, Serialize)]
pub struct IntersectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wkt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<Value>,
}

impl IntersectRequest {
    fn from_body(body: &Value) -> Self {
        Self {
            wkt: body.get("wkt").cloned(),
            layer: body.get("layer").cloned(),
        }
    }
}

/// `GET /api/govmap/address-to-parcel?q=<address>`
pub async fn address_to_parcel(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Relay, ApiError> {
    let url = state.config.govmap_url("address-to-parcel");
    let q = query_value(raw.as_deref(), "q");
    let body = state
        .upstream
        .get(&url, &[("text", q.as_str())], state.govmap_token())
        .await?;
    Ok(Relay(body))
}

/// `GET /api/govmap/parcel?gush=<block>&helka=<parcel>`
pub async fn parcel_geometry(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Relay, ApiError> {
    let url = state.config.govmap_url("parcel");
    let gush = query_value(raw.as_deref(), "gush");
    let helka = query_value(raw.as_deref(), "helka");
    let query = [("gush", gush.as_str()), ("helka", helka.as_str())];
    let body = state
        .upstream
        .get(&url, &query, state.govmap_token())
        .await?;
    Ok(Relay(body))
}

/// `POST /api/govmap/intersect` with `{ "wkt": ..., "layer": ... }`
pub async fn intersect(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Relay, ApiError> {
    let request = IntersectRequest::from_body(&body);
    let url = state.config.govmap_url("intersect");
    let body = state
        .upstream
        .post_json(&url, &request, state.govmap_token())
        .await?;
    Ok(Relay(body))
}
