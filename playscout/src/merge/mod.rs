//! Result normalization and cross-source merge.
//!
//! Converts raw elements from the geographic source and points from the
//! independent local backend into one display-ready sequence of
//! [`PointRecord`]s. Backend entries come first (user-contributed data
//! takes visual precedence) and no cross-source deduplication is performed:
//! a location present in both sources appears twice. Every record passes
//! through a client-side re-evaluation of the active [`FilterSet`], since
//! the upstream query language cannot express synonym tag keys or
//! backend-defined ratings.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::FetchError;
use crate::overpass::Element;
use crate::planner::FilterSet;

/// Where a displayed record came from.
///
/// Callers apply source-specific rendering and trust rules, so every
/// normalized record carries its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// OpenStreetMap via Overpass.
    Osm,
    /// The local points backend.
    Backend,
}

/// A display-ready point of interest from either source.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub source: Source,
    /// Source-scoped identifier (`node/42` for OSM, the document id for
    /// backend points). Not unique across sources.
    pub id: String,
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub rating: Option<f64>,
    pub images: Vec<String>,
}

/// One point as served by `GET /api/points`.
#[derive(Debug, Deserialize)]
struct BackendPoint {
    #[serde(rename = "_id")]
    id: String,
    name: Option<String>,
    location: BackendLocation,
    #[serde(default)]
    tags: BTreeMap<String, serde_json::Value>,
    description: Option<String>,
    #[serde(rename = "appData", default)]
    app_data: BackendAppData,
}

#[derive(Debug, Deserialize)]
struct BackendLocation {
    /// GeoJSON order: longitude first.
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendAppData {
    #[serde(default)]
    images: Vec<String>,
    rating: Option<f64>,
}

impl BackendPoint {
    fn normalize(self) -> Option<PointRecord> {
        let [lon, lat] = self.location.coordinates[..] else {
            return None;
        };
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        Some(PointRecord {
            source: Source::Backend,
            id: self.id,
            name: self.name,
            lat,
            lon,
            description: self.description,
            tags: self.tags.into_iter().map(|(k, v)| (k, stringify(v))).collect(),
            rating: self.app_data.rating,
            images: self.app_data.images,
        })
    }
}

/// Flattens a backend JSON tag value into the string tag space the filter
/// semantics are defined over: `true` becomes `yes`, numbers keep their
/// representation (so numeric `1` stays truthy), strings pass through.
fn stringify(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Bool(true) => "yes".to_string(),
        serde_json::Value::Bool(false) => "no".to_string(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Decodes and normalizes a backend points response.
///
/// Points without resolvable coordinates are dropped silently, matching
/// the treatment of unresolvable OSM elements.
pub fn decode_backend_points(body: &[u8]) -> Result<Vec<PointRecord>, FetchError> {
    let raw: Vec<BackendPoint> =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(raw.into_iter().filter_map(BackendPoint::normalize).collect())
}

/// Normalizes an Overpass element into a display record.
pub fn normalize_element(element: Element) -> PointRecord {
    let name = element.tags.get("name").cloned();
    PointRecord {
        source: Source::Osm,
        id: format!("{}/{}", element.kind.as_str(), element.id),
        name,
        lat: element.lat,
        lon: element.lon,
        description: None,
        tags: element.tags,
        rating: None,
        images: Vec::new(),
    }
}

/// Merges the two normalized sequences into one display list.
///
/// Backend entries first, then OSM; concatenation only, no cross-source
/// deduplication. The filter set is re-applied to every record.
pub fn merge_sources(
    backend: Vec<PointRecord>,
    osm: Vec<PointRecord>,
    filters: &FilterSet,
) -> Vec<PointRecord> {
    backend
        .into_iter()
        .chain(osm)
        .filter(|record| filters.matches(&record.tags, record.rating))
        .collect()
}
