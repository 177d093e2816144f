//! geoproxy-core: Shared library for the geospatial forwarding proxy.
//!
//! Provides the GeoJSON to Esri JSON polygon translation, the ArcGIS host
//! allow-list, the Esri `query` form builder and the tagged upstream body
//! type used when relaying responses.

pub mod allowlist;
pub mod arcgis;
pub mod error;
pub mod geometry;
pub mod loose;
pub mod relay;

// Re-export commonly used items at crate root.
pub use allowlist::{HostAllowList, DEFAULT_ARCGIS_HOST};
pub use arcgis::{SpatialQuery, DEFAULT_OUT_FIELDS};
pub use error::{GeoProxyError, GeoProxyResult};
pub use geometry::{geojson_to_esri_polygon, EsriPolygon, SpatialReference, WGS84_WKID};
pub use loose::{coerce_string, is_truthy, truthy_string};
pub use relay::UpstreamBody;
