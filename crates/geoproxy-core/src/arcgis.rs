//! ArcGIS REST `query` requests.
//!
//! Builds the `application/x-www-form-urlencoded` field list for a spatial
//! intersect query against a MapServer/FeatureServer layer. Coordinates go
//! in and come out in WGS84.

use crate::error::GeoProxyResult;
use crate::geometry::{EsriPolygon, WGS84_WKID};

/// `outFields` value used when the caller does not name any fields.
pub const DEFAULT_OUT_FIELDS: &str = "*";

/// A polygon-intersects query against one ArcGIS layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialQuery {
    pub geometry: EsriPolygon,
    pub out_fields: String,
}

impl SpatialQuery {
    pub fn new(geometry: EsriPolygon, out_fields: Option<String>) -> Self {
        Self {
            geometry,
            out_fields: out_fields.unwrap_or_else(|| DEFAULT_OUT_FIELDS.to_string()),
        }
    }

    /// Query endpoint for a layer: `{layer_url}/query`.
    pub fn query_url(layer_url: &str) -> String {
        format!("{layer_url}/query")
    }

    /// Form fields for the request body, in the order they are sent.
    pub fn form_fields(&self) -> GeoProxyResult<Vec<(&'static str, String)>> {
        let sr = WGS84_WKID.to_string();
        Ok(vec![
            ("f", "json".to_string()),
            ("returnGeometry", "true".to_string()),
            ("outFields", self.out_fields.clone()),
            ("spatialRel", "esriSpatialRelIntersects".to_string()),
            ("geometryType", "esriGeometryPolygon".to_string()),
            ("inSR", sr.clone()),
            ("outSR", sr),
            ("geometry", self.geometry.to_json_string()?),
        ])
    }
}
