//! Fetch configuration.
//!
//! This module defines `FetchConfig`, the single configuration surface for
//! the query planner, the resilient fetcher, and the service-level trigger
//! throttle. Defaults reflect production values against the public Overpass
//! mirrors.

use std::time::Duration;

/// Default per-request timeout for a full-bbox mirror attempt.
pub const DEFAULT_FULL_TIMEOUT: Duration = Duration::from_secs(8);

/// Default per-request timeout for a quadrant (tile) mirror attempt.
///
/// Shorter than the full-bbox timeout: quadrant queries cover a quarter of
/// the area and are expected to answer faster.
pub const DEFAULT_TILE_TIMEOUT: Duration = Duration::from_secs(6);

/// Default minimum search radius in meters.
///
/// Prevents degenerate near-zero queries at very high zoom levels.
pub const DEFAULT_MIN_RADIUS_M: f64 = 500.0;

/// Default maximum search radius in meters.
///
/// Caps the query area at low zoom; larger boxes are nearly guaranteed to
/// time out on the public mirrors.
pub const DEFAULT_MAX_RADIUS_M: f64 = 20_000.0;

/// Default coverage factor applied to the viewport's ground span.
///
/// Searches slightly beyond the visible viewport so results do not pop in
/// at the edges while panning.
pub const DEFAULT_COVERAGE_FACTOR: f64 = 2.0;

/// Default minimum interval between actual network triggers.
pub const DEFAULT_MIN_TRIGGER_INTERVAL: Duration = Duration::from_secs(3);

/// Default minimum center movement (meters) required to trigger a refetch.
pub const DEFAULT_MIN_MOVEMENT_M: f64 = 100.0;

/// Production Overpass mirror endpoints, in priority order.
const DEFAULT_MIRRORS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://overpass.openstreetmap.ru/api/interpreter",
];

/// Configuration for viewport resolution.
///
/// Mirrors are an injected ordered list rather than a module constant so
/// tests can substitute mock endpoints and deployments can vary mirror
/// sets.
#[derive(Clone, Debug)]
pub struct FetchConfig {
    /// Ordered mirror endpoints; tried sequentially per stage.
    pub mirrors: Vec<String>,

    /// Per-request timeout for full-bbox attempts.
    pub full_timeout: Duration,

    /// Per-request timeout for quadrant attempts.
    pub tile_timeout: Duration,

    /// Lower clamp on the derived search radius, in meters.
    pub min_radius_m: f64,

    /// Upper clamp on the derived search radius, in meters.
    pub max_radius_m: f64,

    /// Multiplier on the viewport ground span when deriving the radius.
    pub coverage_factor: f64,

    /// Minimum interval between network triggers.
    pub min_trigger_interval: Duration,

    /// Minimum center movement in meters required to refetch.
    pub min_movement_m: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mirrors: DEFAULT_MIRRORS.iter().map(|s| s.to_string()).collect(),
            full_timeout: DEFAULT_FULL_TIMEOUT,
            tile_timeout: DEFAULT_TILE_TIMEOUT,
            min_radius_m: DEFAULT_MIN_RADIUS_M,
            max_radius_m: DEFAULT_MAX_RADIUS_M,
            coverage_factor: DEFAULT_COVERAGE_FACTOR,
            min_trigger_interval: DEFAULT_MIN_TRIGGER_INTERVAL,
            min_movement_m: DEFAULT_MIN_MOVEMENT_M,
        }
    }
}

impl FetchConfig {
    /// Replace the mirror list.
    pub fn with_mirrors<I, S>(mut self, mirrors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mirrors = mirrors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the full-bbox per-request timeout.
    pub fn with_full_timeout(mut self, timeout: Duration) -> Self {
        self.full_timeout = timeout;
        self
    }

    /// Set the quadrant per-request timeout.
    pub fn with_tile_timeout(mut self, timeout: Duration) -> Self {
        self.tile_timeout = timeout;
        self
    }

    /// Set the radius clamp bounds.
    pub fn with_radius_bounds(mut self, min_m: f64, max_m: f64) -> Self {
        self.min_radius_m = min_m;
        self.max_radius_m = max_m;
        self
    }

    /// Set the coverage factor.
    pub fn with_coverage_factor(mut self, factor: f64) -> Self {
        self.coverage_factor = factor;
        self
    }

    /// Set the trigger throttle parameters.
    pub fn with_trigger_throttle(mut self, min_interval: Duration, min_movement_m: f64) -> Self {
        self.min_trigger_interval = min_interval;
        self.min_movement_m = min_movement_m;
        self
    }
}
