//! Overpass API wire model.
//!
//! serde types for the `{"elements": [...]}` JSON shape returned by
//! Overpass mirrors, and the normalized [`Element`] the rest of the crate
//! works with. Way and relation geometries carry no direct coordinates;
//! they resolve through the `center` attached by `out center;` or, failing
//! that, the midpoint of their `bounds`. An element with no resolvable
//! coordinate is invalid and dropped.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::FetchError;

/// The kind of OSM object an element came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

/// Deduplication key: two elements with the same kind and upstream id are
/// the same object, whichever mirror or quadrant they arrived from.
pub type ElementKey = (ElementKind, u64);

/// A normalized point of interest from the geographic data source.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    pub tags: BTreeMap<String, String>,
}

impl Element {
    /// The element's deduplication key.
    pub fn key(&self) -> ElementKey {
        (self.kind, self.id)
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: ElementKind,
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<RawCoords>,
    bounds: Option<RawBounds>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawCoords {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct RawBounds {
    minlat: f64,
    minlon: f64,
    maxlat: f64,
    maxlon: f64,
}

impl RawElement {
    /// Resolution order: direct coordinates, then `center`, then bounds
    /// midpoint. `None` means the element is unusable.
    fn resolve(self) -> Option<Element> {
        let (lat, lon) = match (self.lat, self.lon, &self.center, &self.bounds) {
            (Some(lat), Some(lon), _, _) => (lat, lon),
            (_, _, Some(center), _) => (center.lat, center.lon),
            (_, _, _, Some(b)) => ((b.minlat + b.maxlat) / 2.0, (b.minlon + b.maxlon) / 2.0),
            _ => return None,
        };
        Some(Element {
            kind: self.kind,
            id: self.id,
            lat,
            lon,
            tags: self.tags,
        })
    }
}

/// Decodes an Overpass response body into normalized elements.
///
/// A body that is not JSON, or that lacks the `elements` sequence, is a
/// decode failure (the mirror loop treats it as a soft failure for that
/// mirror). Individual elements without resolvable coordinates are dropped
/// silently; `discarded` counts them for telemetry.
pub fn decode_response(body: &[u8]) -> Result<(Vec<Element>, usize), FetchError> {
    let raw: RawResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let total = raw.elements.len();
    let elements: Vec<Element> = raw
        .elements
        .into_iter()
        .filter_map(RawElement::resolve)
        .collect();
    let discarded = total - elements.len();
    Ok((elements, discarded))
}
