//! Geographic value types and validation.

use std::fmt;

use super::METERS_PER_DEGREE;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors produced when validating geographic input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// Latitude outside `[-90, 90]` or not finite.
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside `[-180, 180]` or not finite.
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),

    /// Radius must be strictly positive and finite.
    #[error("invalid radius: {0} m")]
    InvalidRadius(f64),
}

/// A validated geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting NaN/infinite or out-of-range coordinates.
    ///
    /// This is the precondition gate for the whole query pipeline: everything
    /// downstream (radius derivation, bounding boxes, query serialization)
    /// assumes coordinates are finite and in range.
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(GeoError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Latitude in degrees.
    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[inline]
    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

/// A map viewport: a validated center plus either a zoom level or an
/// explicit search radius in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Viewport {
    /// Center plus a Web Mercator zoom level; the search radius is derived
    /// from the zoom by the planner.
    Zoomed { center: GeoPoint, zoom: u8 },

    /// Center plus an explicit radius in meters.
    Radius { center: GeoPoint, radius_m: f64 },
}

impl Viewport {
    /// Viewport from center and zoom.
    pub fn at_zoom(center: GeoPoint, zoom: u8) -> Self {
        Self::Zoomed { center, zoom }
    }

    /// Viewport from center and an explicit radius.
    pub fn with_radius(center: GeoPoint, radius_m: f64) -> Result<Self, GeoError> {
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(GeoError::InvalidRadius(radius_m));
        }
        Ok(Self::Radius { center, radius_m })
    }

    /// The viewport's center.
    pub fn center(&self) -> GeoPoint {
        match self {
            Self::Zoomed { center, .. } | Self::Radius { center, .. } => *center,
        }
    }
}

/// Axis-aligned rectangle in latitude/longitude degrees.
///
/// Invariant: `south < north` and `west < east` for every box produced by
/// [`BoundingBox::around`]. Degenerate behavior at the poles is out of
/// scope; the domain is urban/suburban latitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Approximates a circular search area as a bounding box using the
    /// equirectangular projection: one degree of latitude is ~111,320 m
    /// everywhere, one degree of longitude shrinks by `cos(lat)`.
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let dlat = radius_m / METERS_PER_DEGREE;
        let dlon = radius_m / (METERS_PER_DEGREE * (center.lat().to_radians()).cos());
        Self {
            south: center.lat() - dlat,
            west: center.lon() - dlon,
            north: center.lat() + dlat,
            east: center.lon() + dlon,
        }
    }

    /// Splits the box into four equal quadrants at the midpoint of each
    /// axis. The quadrants cover the parent exactly, overlapping only on
    /// the shared midlines.
    ///
    /// Order: south-west, south-east, north-west, north-east.
    pub fn quadrants(&self) -> [BoundingBox; 4] {
        let mid_lat = (self.south + self.north) / 2.0;
        let mid_lon = (self.west + self.east) / 2.0;
        [
            BoundingBox {
                south: self.south,
                west: self.west,
                north: mid_lat,
                east: mid_lon,
            },
            BoundingBox {
                south: self.south,
                west: mid_lon,
                north: mid_lat,
                east: self.east,
            },
            BoundingBox {
                south: mid_lat,
                west: self.west,
                north: self.north,
                east: mid_lon,
            },
            BoundingBox {
                south: mid_lat,
                west: mid_lon,
                north: self.north,
                east: self.east,
            },
        ]
    }

    /// North-south extent in degrees.
    #[inline]
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// West-east extent in degrees.
    #[inline]
    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.5},{:.5},{:.5},{:.5}]",
            self.south, self.west, self.north, self.east
        )
    }
}
