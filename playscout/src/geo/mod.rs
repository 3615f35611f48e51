//! Geographic primitives
//!
//! Provides validated latitude/longitude points, map viewports, and the
//! bounding-box math used to turn a circular search radius into an
//! axis-aligned query rectangle.

mod types;

pub use types::{BoundingBox, GeoError, GeoPoint, Viewport, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

use std::f64::consts::PI;

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Earth's equatorial circumference in meters.
pub const EARTH_CIRCUMFERENCE_M: f64 = 40_075_000.0;

/// Ground resolution in meters per pixel at the given latitude and zoom.
///
/// Standard Web Mercator relation: the equatorial circumference shrinks by
/// `cos(lat)` away from the equator and halves with each zoom step, with 256
/// pixels per tile (hence `zoom + 8`).
#[inline]
pub fn ground_resolution(lat: f64, zoom: u8) -> f64 {
    EARTH_CIRCUMFERENCE_M * (lat * PI / 180.0).cos() / 2.0_f64.powi(zoom as i32 + 8)
}

/// Approximate ground distance between two points in meters.
///
/// Equirectangular approximation, adequate at the viewport scales this
/// crate works with (it feeds a movement threshold, not navigation).
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let mean_lat = ((a.lat() + b.lat()) / 2.0).to_radians();
    let dlat = (b.lat() - a.lat()) * METERS_PER_DEGREE;
    let dlon = (b.lon() - a.lon()) * METERS_PER_DEGREE * mean_lat.cos();
    (dlat * dlat + dlon * dlon).sqrt()
}
