//! ArcGIS map server routes.
//!
//! `layers` hits a single operator-configured endpoint. `query` is the only
//! route that takes an upstream URL from the caller, so it is the only one
//! gated by the host allow-list.

use super::{AppState, JsonBody, Relay};
use crate::error::ApiError;
use axum::extract::State;
use geoproxy_core::{geojson_to_esri_polygon, truthy_string, SpatialQuery};
use serde_json::Value;
use tracing::{debug, warn};

/// `GET /api/arcgis/layers`
pub async fn list_layers(State(state): State<AppState>) -> Result<Relay, ApiError> {
    let body = state
        .upstream
        .get(&state.config.arcgis_layers_url, &[], None)
        .await?;
    Ok(Relay(body))
}

/// `POST /api/arcgis/query` with `{ "layerUrl", "geometry", "outFields"? }`
///
/// Translates the GeoJSON polygon (bare or inside a Feature) to Esri JSON
/// and runs an intersects query against `{layerUrl}/query`. Fields are read
/// loosely: a falsy `layerUrl` is missing, and non-string `layerUrl` or
/// `outFields` values are used in their text form.
pub async fn spatial_query(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Relay, ApiError> {
    let Some(layer_url) = truthy_string(&body, "layerUrl") else {
        return Err(ApiError::BadRequest("layerUrl required".to_string()));
    };
    if !state.config.allowed_hosts.is_allowed(&layer_url) {
        warn!(layer_url = %layer_url, "ArcGIS host not on allow-list");
        return Err(ApiError::Forbidden("ArcGIS host not allowed".to_string()));
    }

    let geometry = geojson_to_esri_polygon(body.get("geometry").unwrap_or(&Value::Null))?;
    let query = SpatialQuery::new(geometry, truthy_string(&body, "outFields"));
    let url = SpatialQuery::query_url(&layer_url);
    debug!(url = %url, out_fields = %query.out_fields, "ArcGIS spatial query");

    let body = state.upstream.post_form(&url, &query.form_fields()?).await?;
    Ok(Relay(body))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::config::ServerConfig;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LAYER_PATH: &str = "/arcgis/rest/services/X/MapServer/0";

    fn polygon() -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[34.78, 32.08], [34.79, 32.08], [34.79, 32.09], [34.78, 32.08]]]
        })
    }

    fn form_of(body: &[u8]) -> HashMap<String, String> {
        url::form_urlencoded::parse(body).into_owned().collect()
    }

    #[tokio::test]
    async fn test_missing_layer_url_is_400() {
        let resp = send_post_json(
            app(ServerConfig::default()),
            "/api/arcgis/query",
            &json!({ "geometry": polygon() }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.json(), json!({ "error": "layerUrl required" }));

        let resp = send_post_json(
            app(ServerConfig::default()),
            "/api/arcgis/query",
            &json!({ "layerUrl": "", "geometry": polygon() }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_disallowed_host_is_403() {
        let resp = send_post_json(
            app(ServerConfig::default()),
            "/api/arcgis/query",
            &json!({ "layerUrl": "https://evil.example.com/layer", "geometry": polygon() }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::FORBIDDEN);
        assert_eq!(resp.json(), json!({ "error": "ArcGIS host not allowed" }));
    }

    #[tokio::test]
    async fn test_unparseable_layer_url_is_403() {
        let resp = send_post_json(
            app(ServerConfig::default()),
            "/api/arcgis/query",
            &json!({ "layerUrl": "not a url", "geometry": polygon() }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_query_forwards_translated_geometry() {
        let mock_server = MockServer::start().await;
        let upstream = json!({
            "features": [{ "attributes": { "OBJECTID": 7, "ms_gush": 6904 } }],
            "geometryType": "esriGeometryPolygon"
        });
        Mock::given(method("POST"))
            .and(path(format!("{LAYER_PATH}/query")))
            .and(header_eq("content-type", "application/x-www-form-urlencoded"))
            .respond_with(ResponseTemplate::new(200).set_body_json(upstream.clone()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let layer_url = format!("{}{LAYER_PATH}", mock_server.uri());
        let resp = send_post_json(
            app(config_for(&mock_server.uri())),
            "/api/arcgis/query",
            &json!({ "layerUrl": layer_url, "geometry": polygon() }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.json(), upstream);

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let form = form_of(&requests[0].body);
        assert_eq!(form["f"], "json");
        assert_eq!(form["returnGeometry"], "true");
        assert_eq!(form["outFields"], "*");
        assert_eq!(form["spatialRel"], "esriSpatialRelIntersects");
        assert_eq!(form["geometryType"], "esriGeometryPolygon");
        assert_eq!(form["inSR"], "4326");
        assert_eq!(form["outSR"], "4326");

        let geometry: Value = serde_json::from_str(&form["geometry"]).unwrap();
        assert_eq!(
            geometry,
            json!({
                "rings": polygon()["coordinates"],
                "spatialReference": { "wkid": 4326 }
            })
        );
    }

    #[tokio::test]
    async fn test_feature_wrapper_and_out_fields() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;

        let layer_url = format!("{}{LAYER_PATH}", mock_server.uri());
        let feature = json!({ "type": null, "properties": {}, "geometry": polygon() });
        let resp = send_post_json(
            app(config_for(&mock_server.uri())),
            "/api/arcgis/query",
            &json!({ "layerUrl": layer_url, "geometry": feature, "outFields": "ms_gush,ms_helka" }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::OK);

        let requests = mock_server.received_requests().await.unwrap();
        let form = form_of(&requests[0].body);
        assert_eq!(form["outFields"], "ms_gush,ms_helka");
        let geometry: Value = serde_json::from_str(&form["geometry"]).unwrap();
        assert_eq!(geometry["rings"], polygon()["coordinates"]);
    }

    #[tokio::test]
    async fn test_text_response_relayed_raw() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Invalid or missing input parameters."))
            .mount(&mock_server)
            .await;

        let layer_url = format!("{}{LAYER_PATH}", mock_server.uri());
        let resp = send_post_json(
            app(config_for(&mock_server.uri())),
            "/api/arcgis/query",
            &json!({ "layerUrl": layer_url, "geometry": polygon() }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.text(), "Invalid or missing input parameters.");
    }

    #[tokio::test]
    async fn test_non_polygon_is_500_without_upstream_call() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(0)
            .mount(&mock_server)
            .await;

        let layer_url = format!("{}{LAYER_PATH}", mock_server.uri());
        let resp = send_post_json(
            app(config_for(&mock_server.uri())),
            "/api/arcgis/query",
            &json!({ "layerUrl": layer_url, "geometry": { "type": "Point", "coordinates": [34.78, 32.08] } }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.json(),
            json!({ "error": "unsupported geometry type: Point (only Polygon supported)" })
        );
    }

    #[tokio::test]
    async fn test_missing_geometry_is_500() {
        let resp = send_post_json(
            app(config_for("http://127.0.0.1:1")),
            "/api/arcgis/query",
            &json!({ "layerUrl": format!("http://127.0.0.1:1{LAYER_PATH}") }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unreachable_layer_is_500() {
        let resp = send_post_json(
            app(config_for("http://127.0.0.1:1")),
            "/api/arcgis/query",
            &json!({ "layerUrl": format!("http://127.0.0.1:1{LAYER_PATH}"), "geometry": polygon() }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.json()["error"]
            .as_str()
            .is_some_and(|e| e.contains("/query failed")));
    }

    #[tokio::test]
    async fn test_malformed_json_body_rejected() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/arcgis/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"layerUrl\": "))
            .unwrap();
        let resp = send(app(ServerConfig::default()), req).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.json()["error"].is_string());
    }

    #[tokio::test]
    async fn test_repeated_queries_are_not_cached() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{LAYER_PATH}/query")))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"features":[]}"#))
            .expect(2)
            .mount(&mock_server)
            .await;

        let layer_url = format!("{}{LAYER_PATH}", mock_server.uri());
        let body = json!({ "layerUrl": layer_url, "geometry": polygon() });
        for _ in 0..2 {
            let resp = send_post_json(app(config_for(&mock_server.uri())), "/api/arcgis/query", &body).await;
            assert_eq!(resp.status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_list_layers_uses_fixed_endpoint() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/arcgis/rest/services/IView2/MapServer/layers"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"layers":[{"id":0,"name":"Parcels"}]}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let resp = send_get(app(config_for(&mock_server.uri())), "/api/arcgis/layers").await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.json()["layers"][0]["name"], "Parcels");
    }

    #[tokio::test]
    async fn test_falsy_layer_url_is_400() {
        for layer_url in [json!(false), json!(null), json!(0)] {
            let resp = send_post_json(
                app(ServerConfig::default()),
                "/api/arcgis/query",
                &json!({ "layerUrl": layer_url, "geometry": polygon() }),
            )
            .await;
            assert_eq!(resp.status, StatusCode::BAD_REQUEST);
            assert_eq!(resp.json(), json!({ "error": "layerUrl required" }));
        }
    }

    #[tokio::test]
    async fn test_non_string_layer_url_is_403() {
        for layer_url in [json!(123), json!(true), json!({ "host": "gisn.tel-aviv.gov.il" })] {
            let resp = send_post_json(
                app(ServerConfig::default()),
                "/api/arcgis/query",
                &json!({ "layerUrl": layer_url, "geometry": polygon() }),
            )
            .await;
            assert_eq!(resp.status, StatusCode::FORBIDDEN);
            assert_eq!(resp.json(), json!({ "error": "ArcGIS host not allowed" }));
        }
    }

    #[tokio::test]
    async fn test_array_out_fields_joined() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{LAYER_PATH}/query")))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let layer_url = format!("{}{LAYER_PATH}", mock_server.uri());
        let resp = send_post_json(
            app(config_for(&mock_server.uri())),
            "/api/arcgis/query",
            &json!({ "layerUrl": layer_url, "geometry": polygon(), "outFields": ["ms_gush", "ms_helka"] }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::OK);

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(form_of(&requests[0].body)["outFields"], "ms_gush,ms_helka");
    }

    #[tokio::test]
    async fn test_falsy_out_fields_defaults_to_all() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;

        let layer_url = format!("{}{LAYER_PATH}", mock_server.uri());
        send_post_json(
            app(config_for(&mock_server.uri())),
            "/api/arcgis/query",
            &json!({ "layerUrl": layer_url, "geometry": polygon(), "outFields": "" }),
        )
        .await;

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(form_of(&requests[0].body)["outFields"], "*");
    }

    #[tokio::test]
    async fn test_non_json_body_reads_as_empty() {
        let body = json!({ "layerUrl": "https://gisn.tel-aviv.gov.il/x", "geometry": polygon() });
        let no_content_type = Request::builder()
            .method(Method::POST)
            .uri("/api/arcgis/query")
            .body(Body::from(body.to_string()))
            .unwrap();
        let text_plain = Request::builder()
            .method(Method::POST)
            .uri("/api/arcgis/query")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(body.to_string()))
            .unwrap();

        for req in [no_content_type, text_plain] {
            let resp = send(app(ServerConfig::default()), req).await;
            assert_eq!(resp.status, StatusCode::BAD_REQUEST);
            assert_eq!(resp.json(), json!({ "error": "layerUrl required" }));
        }
    }

    #[tokio::test]
    async fn test_non_object_json_body_is_400() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/arcgis/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("\"https://gisn.tel-aviv.gov.il/x\""))
            .unwrap();
        let resp = send(app(ServerConfig::default()), req).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.json()["error"].is_string());
    }
}
