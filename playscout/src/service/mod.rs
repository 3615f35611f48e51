//! Caller-facing resolution service.
//!
//! `PlaygroundService` is what a map view talks to on viewport settle: it
//! plans the query, runs it through the resilient fetcher, optionally
//! queries the local points backend, and merges the two sources into one
//! display list.
//!
//! Viewport-change events arrive continuously while the user pans and
//! zooms. Two mechanisms keep that tractable:
//!
//! - [`TriggerGate`] throttles actual network triggers (minimum interval
//!   plus minimum center movement); debouncing the raw event stream stays
//!   with the UI layer.
//! - Every resolution is stamped with a monotonically increasing
//!   generation. A slow response that arrives after a newer request was
//!   issued is stale; callers check [`ResolvedBatch::generation`] against
//!   [`PlaygroundService::latest_generation`] and drop superseded batches
//!   instead of letting them overwrite fresher state.

mod gate;

pub use gate::TriggerGate;

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::fetch::{AsyncHttpClient, ResilientFetcher};
use crate::geo::Viewport;
use crate::merge::{decode_backend_points, merge_sources, normalize_element, PointRecord};
use crate::overpass::Element;
use crate::planner::{build_plan, compute_bounding_box, effective_radius, FilterSet};

/// A batch of results stamped with the generation of the request that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBatch<T> {
    pub generation: u64,
    pub items: Vec<T>,
}

/// Viewport resolution service over an injected HTTP client.
pub struct PlaygroundService<C: AsyncHttpClient> {
    fetcher: ResilientFetcher<C>,
    backend_base: Option<String>,
    generation: AtomicU64,
}

impl<C: AsyncHttpClient> PlaygroundService<C> {
    /// Creates a service without a local backend: results come from the
    /// geographic source only.
    pub fn new(http_client: C, config: FetchConfig) -> Self {
        Self {
            fetcher: ResilientFetcher::new(http_client, config),
            backend_base: None,
            generation: AtomicU64::new(0),
        }
    }

    /// Configures the local points backend base URL (e.g.
    /// `https://api.example.org`).
    pub fn with_backend(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        self.backend_base = Some(base.trim_end_matches('/').to_string());
        self
    }

    /// The underlying fetcher (metrics access).
    pub fn fetcher(&self) -> &ResilientFetcher<C> {
        &self.fetcher
    }

    /// A trigger gate configured from this service's fetch config.
    pub fn trigger_gate(&self) -> TriggerGate {
        let config = self.fetcher.config();
        TriggerGate::new(config.min_trigger_interval, config.min_movement_m)
    }

    /// Generation of the most recently issued request.
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Resolves a viewport to geographic-source elements, filtered
    /// client-side.
    ///
    /// The sole entry point a map view calls on viewport settle. Total
    /// upstream failure yields an empty batch, which renders as "no
    /// results in this area", never as an error.
    pub async fn resolve_viewport(
        &self,
        viewport: Viewport,
        filters: &FilterSet,
    ) -> ResolvedBatch<Element> {
        let generation = self.next_generation();
        let elements = self.fetch_elements(&viewport, filters).await;
        let items: Vec<Element> = elements
            .into_iter()
            .filter(|e| filters.matches(&e.tags, None))
            .collect();
        debug!(generation, count = items.len(), "viewport resolved");
        ResolvedBatch { generation, items }
    }

    /// Resolves a viewport against both sources and merges them:
    /// backend points first, then geographic elements, each re-filtered
    /// client-side.
    ///
    /// A backend failure degrades to geographic results only; it is
    /// logged, not surfaced.
    pub async fn resolve_merged(
        &self,
        viewport: Viewport,
        filters: &FilterSet,
    ) -> ResolvedBatch<PointRecord> {
        let generation = self.next_generation();
        let elements = self.fetch_elements(&viewport, filters).await;
        let osm: Vec<PointRecord> = elements.into_iter().map(normalize_element).collect();
        let backend = self.fetch_backend_points(&viewport, filters).await;
        let items = merge_sources(backend, osm, filters);
        debug!(generation, count = items.len(), "merged viewport resolved");
        ResolvedBatch { generation, items }
    }

    async fn fetch_elements(&self, viewport: &Viewport, filters: &FilterSet) -> Vec<Element> {
        let config = self.fetcher.config();
        let radius = effective_radius(viewport, config);
        let bbox = compute_bounding_box(viewport.center(), radius);
        let plan = build_plan(bbox, filters, config.full_timeout);
        self.fetcher.execute(&plan).await
    }

    async fn fetch_backend_points(
        &self,
        viewport: &Viewport,
        filters: &FilterSet,
    ) -> Vec<PointRecord> {
        let Some(base) = &self.backend_base else {
            return Vec::new();
        };
        let url = backend_points_url(base, viewport, filters, self.fetcher.config());
        let timeout = self.fetcher.config().full_timeout;
        match self.fetcher.http_client().get(&url, timeout).await {
            Ok(body) => match decode_backend_points(&body) {
                Ok(points) => points,
                Err(e) => {
                    warn!(error = %e, "backend response not decodable");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(error = %e, "backend query failed");
                Vec::new()
            }
        }
    }
}

/// Builds the backend collaborator query URL:
/// `GET /api/points?lat&lon&radius&...filters`.
fn backend_points_url(
    base: &str,
    viewport: &Viewport,
    filters: &FilterSet,
    config: &FetchConfig,
) -> String {
    let center = viewport.center();
    let radius = effective_radius(viewport, config);
    let mut url = format!(
        "{base}/api/points?lat={}&lon={}&radius={}",
        center.lat(),
        center.lon(),
        radius
    );
    for (key, value) in filters.features() {
        url.push_str(&format!("&{key}={value}"));
    }
    if let Some(surface) = filters.surface() {
        url.push_str(&format!("&surface={surface}"));
    }
    if let Some(theme) = filters.theme() {
        url.push_str(&format!("&theme={theme}"));
    }
    if let Some(min_age) = filters.min_age() {
        url.push_str(&format!("&min_age={min_age}"));
    }
    if let Some(max_age) = filters.max_age() {
        url.push_str(&format!("&max_age={max_age}"));
    }
    if let Some(min_rating) = filters.min_rating() {
        url.push_str(&format!("&min_rating={min_rating}"));
    }
    url
}
