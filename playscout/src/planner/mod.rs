//! Query planning
//!
//! Deterministic translation of a map viewport plus a filter set into a
//! fully-resolved Overpass query plan. Everything in this module is pure:
//! no I/O, no clock, no failure paths — which keeps it unit-testable
//! without network access.

mod filters;

pub use filters::{tag_value_active, FilterSet};

use std::time::Duration;

use crate::config::FetchConfig;
use crate::geo::{ground_resolution, BoundingBox, GeoPoint, Viewport};

/// Pixels per map tile; the viewport span is one tile's worth of pixels at
/// the given ground resolution.
const TILE_PIXELS: f64 = 256.0;

/// Derives a search radius in meters from a map zoom level.
///
/// Higher zoom (closer view) searches a smaller area: the ground resolution
/// halves with each zoom step, and the result is scaled by the configured
/// coverage factor then clamped to `[min_radius_m, max_radius_m]`. Clamping
/// avoids both degenerate near-zero queries and boxes so large the upstream
/// is guaranteed to time out.
pub fn compute_radius(zoom: u8, center_lat: f64, config: &FetchConfig) -> f64 {
    let span_m = ground_resolution(center_lat, zoom) * TILE_PIXELS;
    (span_m * config.coverage_factor).clamp(config.min_radius_m, config.max_radius_m)
}

/// Resolves a viewport to its effective search radius in meters.
///
/// Explicit radii are clamped to the same bounds as derived ones.
pub fn effective_radius(viewport: &Viewport, config: &FetchConfig) -> f64 {
    match viewport {
        Viewport::Zoomed { center, zoom } => compute_radius(*zoom, center.lat(), config),
        Viewport::Radius { radius_m, .. } => {
            radius_m.clamp(config.min_radius_m, config.max_radius_m)
        }
    }
}

/// Derives the query bounding box for a viewport.
pub fn compute_bounding_box(center: GeoPoint, radius_m: f64) -> BoundingBox {
    BoundingBox::around(center, radius_m)
}

/// A fully-resolved Overpass request: bounding box, filter clauses, and the
/// per-attempt timeout budget. Created fresh per fetch; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    bbox: BoundingBox,
    clauses: Vec<String>,
    timeout: Duration,
}

impl QueryPlan {
    /// The plan's bounding box.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// The plan's per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The tag filter clauses, in deterministic order.
    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    /// A copy of this plan scoped to a different bounding box and timeout.
    ///
    /// Used by the subdivision stage: quadrant queries reuse the filter
    /// clauses with a smaller box and a shorter timeout.
    pub fn for_bbox(&self, bbox: BoundingBox, timeout: Duration) -> Self {
        Self {
            bbox,
            clauses: self.clauses.clone(),
            timeout,
        }
    }

    /// Serializes the plan into Overpass QL.
    ///
    /// Queries nodes, ways, and relations tagged `leisure=playground` within
    /// the bbox; `out center;` asks the server to attach a representative
    /// coordinate to way/relation geometries.
    pub fn to_overpass_ql(&self) -> String {
        let timeout_s = self.timeout.as_secs().max(1);
        let clauses = self.clauses.concat();
        let bbox = format!(
            "{},{},{},{}",
            self.bbox.south, self.bbox.west, self.bbox.north, self.bbox.east
        );
        format!(
            "[out:json][timeout:{timeout_s}];(\
             node[\"leisure\"=\"playground\"]{clauses}({bbox});\
             way[\"leisure\"=\"playground\"]{clauses}({bbox});\
             relation[\"leisure\"=\"playground\"]{clauses}({bbox}););\
             out center;"
        )
    }
}

/// Assembles a query plan from a bounding box, a filter set, and a timeout.
pub fn build_plan(bbox: BoundingBox, filters: &FilterSet, timeout: Duration) -> QueryPlan {
    QueryPlan {
        bbox,
        clauses: filters.clauses(),
        timeout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lisbon() -> GeoPoint {
        GeoPoint::new(38.7169, -9.1390).unwrap()
    }

    #[test]
    fn test_radius_monotonically_decreasing_in_zoom() {
        let config = FetchConfig::default();
        let mut prev = f64::MAX;
        for zoom in 0..=22u8 {
            let r = compute_radius(zoom, 38.7169, &config);
            assert!(r <= prev, "radius grew at zoom {}", zoom);
            prev = r;
        }
    }

    #[test]
    fn test_radius_always_within_clamp_bounds() {
        let config = FetchConfig::default();
        for zoom in 0..=30u8 {
            let r = compute_radius(zoom, 52.52, &config);
            assert!(r >= config.min_radius_m);
            assert!(r <= config.max_radius_m);
        }
    }

    #[test]
    fn test_lisbon_zoom_15_scenario() {
        // End-to-end planning expectation: zoom 15 over Lisbon should
        // search a neighborhood-scale radius, and the bbox's north-south
        // span must be ~2x that radius.
        let config = FetchConfig::default();
        let radius = compute_radius(15, lisbon().lat(), &config);
        assert!(
            (500.0..=3000.0).contains(&radius),
            "unexpected radius {}",
            radius
        );

        let bbox = compute_bounding_box(lisbon(), radius);
        let span_m = bbox.lat_span() * crate::geo::METERS_PER_DEGREE;
        let expected = 2.0 * radius;
        assert!(
            (span_m - expected).abs() / expected < 0.05,
            "span {} not within 5% of {}",
            span_m,
            expected
        );
    }

    #[test]
    fn test_effective_radius_clamps_explicit_radius() {
        let config = FetchConfig::default();
        let viewport = Viewport::with_radius(lisbon(), 1_000_000.0).unwrap();
        assert_eq!(effective_radius(&viewport, &config), config.max_radius_m);
    }

    #[test]
    fn test_plan_serialization_contains_selector_and_bbox() {
        let bbox = BoundingBox {
            south: 38.7,
            west: -9.2,
            north: 38.8,
            east: -9.1,
        };
        let plan = build_plan(bbox, &FilterSet::default(), Duration::from_secs(8));
        let ql = plan.to_overpass_ql();
        assert!(ql.starts_with("[out:json][timeout:8];"));
        assert!(ql.contains("node[\"leisure\"=\"playground\"](38.7,-9.2,38.8,-9.1);"));
        assert!(ql.contains("way[\"leisure\"=\"playground\"]"));
        assert!(ql.contains("relation[\"leisure\"=\"playground\"]"));
        assert!(ql.ends_with("out center;"));
    }

    #[test]
    fn test_single_feature_filter_appends_one_clause() {
        let mut filters = FilterSet::default();
        filters.set_feature("playground:slide", "yes");
        let bbox = BoundingBox::around(lisbon(), 1000.0);
        let plan = build_plan(bbox, &filters, Duration::from_secs(8));
        assert_eq!(plan.clauses().len(), 1);
        assert_eq!(plan.clauses()[0], "[\"playground:slide\"=\"yes\"]");

        // Every selector line carries the clause.
        let ql = plan.to_overpass_ql();
        assert_eq!(ql.matches("[\"playground:slide\"=\"yes\"]").count(), 3);
    }

    #[test]
    fn test_for_bbox_keeps_clauses() {
        let mut filters = FilterSet::default();
        filters.set_feature("playground:swing", "yes");
        let bbox = BoundingBox::around(lisbon(), 2000.0);
        let plan = build_plan(bbox, &filters, Duration::from_secs(8));
        let quad = bbox.quadrants()[0];
        let sub = plan.for_bbox(quad, Duration::from_secs(6));
        assert_eq!(sub.clauses(), plan.clauses());
        assert_eq!(sub.bbox(), quad);
        assert_eq!(sub.timeout(), Duration::from_secs(6));
    }
}
