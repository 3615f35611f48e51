//! PlayScout - resilient playground discovery over public geographic data
//!
//! This library is the shared fetch-resolution core behind the PlayScout
//! map surfaces: it turns a map viewport (center + zoom, or center +
//! radius) into an Overpass query, executes it against a prioritized list
//! of unreliable public mirrors with per-request timeouts, falls back to
//! quadrant subdivision when the full-area query fails everywhere, and
//! merges the deduplicated results with points from the local backend.
//!
//! # Architecture
//!
//! ```text
//! Viewport ──► planner (pure) ──► QueryPlan ──► fetch (mirrors, tiles)
//!                                                    │
//! GET /api/points ──────────────► merge ◄────────── Element[]
//!                                   │
//!                                   ▼
//!                              PointRecord[]
//! ```
//!
//! The planner is pure and never fails; the fetcher never errors toward
//! the caller (total upstream failure is an empty result); validation of
//! geographic input happens once, at construction of [`geo::GeoPoint`] /
//! [`geo::Viewport`].

pub mod config;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod merge;
pub mod overpass;
pub mod planner;
pub mod service;
pub mod telemetry;

pub use config::FetchConfig;
pub use error::FetchError;
pub use fetch::{AsyncHttpClient, ReqwestClient, ResilientFetcher};
pub use geo::{BoundingBox, GeoError, GeoPoint, Viewport};
pub use merge::{PointRecord, Source};
pub use overpass::{Element, ElementKind};
pub use planner::{FilterSet, QueryPlan};
pub use service::{PlaygroundService, ResolvedBatch, TriggerGate};
