//! Outbound HTTP calls to GovMap and ArcGIS.
//!
//! Every call reads the whole response body as text and classifies it with
//! [`UpstreamBody::from_text`]. The upstream status code is not inspected;
//! whatever the provider answered is relayed. There are no retries and no
//! caching, so each inbound request costs exactly one outbound call.

use geoproxy_core::{GeoProxyError, GeoProxyResult, UpstreamBody};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Shared HTTP client for upstream providers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Create a client. `timeout = None` waits on upstreams indefinitely.
    pub fn new(timeout: Option<Duration>) -> GeoProxyResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| GeoProxyError::Upstream(format!("failed to build http client: {e}")))?;
        Ok(Self { http })
    }

    /// GET `url` with the given query parameters appended.
    pub async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> GeoProxyResult<UpstreamBody> {
        debug!(url = %url, "forwarding GET");
        let mut req = self.http.get(url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        Self::relay(req, url).await
    }

    /// POST a JSON body to `url`.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        bearer: Option<&str>,
    ) -> GeoProxyResult<UpstreamBody> {
        debug!(url = %url, "forwarding JSON POST");
        let mut req = self.http.post(url).json(body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        Self::relay(req, url).await
    }

    /// POST an `application/x-www-form-urlencoded` body to `url`.
    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, String)],
    ) -> GeoProxyResult<UpstreamBody> {
        debug!(url = %url, field_count = fields.len(), "forwarding form POST");
        let req = self.http.post(url).form(fields);
        Self::relay(req, url).await
    }

    async fn relay(req: reqwest::RequestBuilder, url: &str) -> GeoProxyResult<UpstreamBody> {
        let response = req
            .send()
            .await
            .map_err(|e| GeoProxyError::Upstream(format!("request to {url} failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GeoProxyError::Upstream(format!("reading body from {url} failed: {e}")))?;

        let body = UpstreamBody::from_text(text);
        debug!(
            url = %url,
            status = %status,
            json = body.is_json(),
            bytes = body.len_hint(),
            "upstream responded"
        );
        Ok(body)
    }
}
