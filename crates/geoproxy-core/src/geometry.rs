//! GeoJSON Polygon to Esri JSON polygon translation.
//!
//! ArcGIS REST services speak Esri JSON, where a polygon is a set of `rings`
//! plus an explicit `spatialReference`. GeoJSON polygons already carry their
//! linear rings under `coordinates`, so the translation moves that value
//! across untouched and stamps it with WGS84.
//!
//! Coordinates are assumed, not checked, to be WGS84 longitude/latitude.
//! No reprojection, ring-winding correction or closure validation happens
//! here; the upstream service sees exactly what the browser sent.

use crate::error::{GeoProxyError, GeoProxyResult};
use crate::loose::is_truthy;
use serde::Serialize;
use serde_json::Value;

/// Well-known ID of WGS84 geographic coordinates (EPSG:4326).
pub const WGS84_WKID: u32 = 4326;

/// Esri spatial reference object (`{"wkid": 4326}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

impl SpatialReference {
    pub fn wgs84() -> Self {
        Self { wkid: WGS84_WKID }
    }
}

/// Esri JSON polygon.
///
/// `rings` holds the GeoJSON `coordinates` value verbatim. A polygon whose
/// source had no `coordinates` member serialises without `rings`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EsriPolygon {
    #[serde(skip_serializing_if = "Value::is_null")]
    pub rings: Value,
    pub spatial_reference: SpatialReference,
}

impl EsriPolygon {
    /// Compact JSON text, as sent in the `geometry` form field.
    pub fn to_json_string(&self) -> GeoProxyResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Resolve the geometry object inside `input`.
///
/// A value with a non-empty `type` member is already a geometry. Anything
/// else is treated as a Feature-like wrapper and its `geometry` member is
/// used. Returns `None` when neither is present.
pub fn resolve_geometry(input: &Value) -> Option<&Value> {
    if input.get("type").is_some_and(is_truthy) {
        return Some(input);
    }
    input.get("geometry").filter(|g| is_truthy(g))
}

/// Translate a GeoJSON Polygon (bare or wrapped in a Feature) into an
/// Esri JSON polygon in WGS84.
///
/// # Errors
///
/// Returns [`GeoProxyError::UnsupportedGeometry`] when the resolved geometry
/// is not of type `"Polygon"`.
pub fn geojson_to_esri_polygon(input: &Value) -> GeoProxyResult<EsriPolygon> {
    let geometry = resolve_geometry(input);
    let kind = geometry.and_then(|g| g.get("type"));

    match kind {
        Some(Value::String(s)) if s == "Polygon" => {}
        Some(Value::String(s)) => return Err(GeoProxyError::UnsupportedGeometry(s.clone())),
        Some(other) if !other.is_null() => {
            return Err(GeoProxyError::UnsupportedGeometry(other.to_string()))
        }
        _ => return Err(GeoProxyError::UnsupportedGeometry("none".to_string())),
    }

    Ok(EsriPolygon {
        rings: geometry
            .and_then(|g| g.get("coordinates"))
            .cloned()
            .unwrap_or(Value::Null),
        spatial_reference: SpatialReference::wgs84(),
    })
}
