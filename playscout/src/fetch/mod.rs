//! Resilient query execution
//!
//! Executes a [`QueryPlan`] against an ordered list of mirror endpoints
//! with per-request timeouts and graceful degradation:
//!
//! 1. **FullQuery** — the plan's bbox is tried against each mirror
//!    sequentially; the first mirror answering 2xx with a decodable body
//!    wins. Sequential rather than fan-out: the upstream is a shared,
//!    rate-limited public service with no SLA.
//! 2. **Subdivide** — if every mirror fails, the bbox is split into four
//!    quadrants and each quadrant independently repeats the mirror loop
//!    under a shorter timeout. One large timeout-prone request becomes four
//!    smaller ones; a latency-for-reliability trade bounded at
//!    `mirrors x 4` extra requests, with no retries or backoff beyond that.
//! 3. Per-quadrant results are merged with `(kind, id)` deduplication,
//!    first occurrence wins.
//!
//! Total failure at every stage returns an empty list, not an error: the
//! caller renders "no results in this area" and the telemetry counters
//! carry the distinction.

mod http;

pub use http::{AsyncHttpClient, ReqwestClient};

#[cfg(test)]
pub use http::tests::{RecordedRequest, ScriptedHttpClient};

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::overpass::{decode_response, Element, ElementKey};
use crate::planner::QueryPlan;
use crate::telemetry::FetchMetrics;

/// Executes query plans against unreliable mirrors with fallback.
pub struct ResilientFetcher<C: AsyncHttpClient> {
    http_client: C,
    config: FetchConfig,
    metrics: Arc<FetchMetrics>,
}

impl<C: AsyncHttpClient> ResilientFetcher<C> {
    /// Creates a fetcher over an injected HTTP client and mirror
    /// configuration.
    pub fn new(http_client: C, config: FetchConfig) -> Self {
        Self {
            http_client,
            config,
            metrics: Arc::new(FetchMetrics::new()),
        }
    }

    /// The fetcher's metrics handle.
    pub fn metrics(&self) -> Arc<FetchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// The fetcher's configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// The underlying HTTP client (shared with the backend query path).
    pub(crate) fn http_client(&self) -> &C {
        &self.http_client
    }

    /// Resolves a plan to a deduplicated element list.
    ///
    /// Never fails: exhausting every mirror at every stage yields an empty
    /// list.
    pub async fn execute(&self, plan: &QueryPlan) -> Vec<Element> {
        if let Some(elements) = self.try_mirrors(plan, false).await {
            if elements.is_empty() {
                self.metrics.empty_fetch();
            }
            self.metrics.elements_returned(elements.len() as u64);
            return elements;
        }

        debug!(bbox = %plan.bbox(), "full-area query failed on all mirrors, subdividing");
        self.metrics.subdivision();
        let merged = self.execute_subdivided(plan).await;
        if merged.is_empty() {
            self.metrics.empty_fetch();
        }
        self.metrics.elements_returned(merged.len() as u64);
        merged
    }

    /// Runs the per-quadrant mirror loops and merges their results.
    async fn execute_subdivided(&self, plan: &QueryPlan) -> Vec<Element> {
        let mut merged: Vec<Element> = Vec::new();
        let mut seen: HashSet<ElementKey> = HashSet::new();
        let mut duplicates = 0u64;

        for quadrant in plan.bbox().quadrants() {
            let sub_plan = plan.for_bbox(quadrant, self.config.tile_timeout);
            // A quadrant that fails everywhere contributes nothing; the
            // remaining quadrants still run.
            let Some(elements) = self.try_mirrors(&sub_plan, true).await else {
                continue;
            };
            for element in elements {
                if seen.insert(element.key()) {
                    merged.push(element);
                } else {
                    duplicates += 1;
                }
            }
        }

        if duplicates > 0 {
            self.metrics.duplicates_dropped(duplicates);
        }
        merged
    }

    /// Sequential mirror loop for one bbox.
    ///
    /// In the full-area stage any decodable response wins, empty included.
    /// In the quadrant stage (`require_nonempty`) an empty result keeps the
    /// loop trying later mirrors; only a non-empty result wins the
    /// quadrant. Returns `None` when no mirror produced a winning result.
    async fn try_mirrors(&self, plan: &QueryPlan, require_nonempty: bool) -> Option<Vec<Element>> {
        let query = plan.to_overpass_ql();
        for mirror in &self.config.mirrors {
            self.metrics.mirror_attempt();
            match self.attempt(mirror, &query, plan).await {
                Ok(elements) => {
                    if require_nonempty && elements.is_empty() {
                        debug!(mirror = %mirror, "empty quadrant result, trying next mirror");
                        continue;
                    }
                    debug!(mirror = %mirror, count = elements.len(), "mirror answered");
                    return Some(elements);
                }
                Err(e) => {
                    // Soft failure: advance to the next mirror.
                    self.metrics.mirror_failure();
                    warn!(mirror = %mirror, error = %e, "mirror attempt failed");
                }
            }
        }
        None
    }

    async fn attempt(
        &self,
        mirror: &str,
        query: &str,
        plan: &QueryPlan,
    ) -> Result<Vec<Element>, FetchError> {
        let body = self
            .http_client
            .post_form(mirror, query, plan.timeout())
            .await?;
        let (elements, discarded) = decode_response(&body)?;
        if discarded > 0 {
            self.metrics.elements_discarded(discarded as u64);
        }
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::geo::{BoundingBox, GeoPoint};
    use crate::planner::{build_plan, FilterSet};

    fn mirrors() -> [&'static str; 3] {
        ["http://m1/api", "http://m2/api", "http://m3/api"]
    }

    fn test_config() -> FetchConfig {
        FetchConfig::default().with_mirrors(mirrors())
    }

    fn plan() -> QueryPlan {
        let center = GeoPoint::new(38.7169, -9.1390).unwrap();
        let bbox = BoundingBox::around(center, 2000.0);
        build_plan(bbox, &FilterSet::default(), Duration::from_secs(8))
    }

    /// Overpass-shaped body with the given node ids.
    fn body_with_nodes(ids: &[u64]) -> Vec<u8> {
        let elements: Vec<String> = ids
            .iter()
            .map(|id| {
                format!(r#"{{"type":"node","id":{id},"lat":38.7,"lon":-9.1,"tags":{{}}}}"#)
            })
            .collect();
        format!(r#"{{"elements":[{}]}}"#, elements.join(",")).into_bytes()
    }

    fn ids(elements: &[Element]) -> Vec<u64> {
        elements.iter().map(|e| e.id).collect()
    }

    #[tokio::test]
    async fn test_first_mirror_success_short_circuits() {
        let mock = ScriptedHttpClient::new([Ok(body_with_nodes(&[1, 2]))]);
        let fetcher = ResilientFetcher::new(mock, test_config());
        let result = fetcher.execute(&plan()).await;
        assert_eq!(ids(&result), vec![1, 2]);
        assert_eq!(fetcher.metrics().snapshot().mirror_attempts, 1);
    }

    #[tokio::test]
    async fn test_fallback_to_third_mirror_without_subdivision() {
        // First two mirrors always fail, third succeeds for the full bbox:
        // the third mirror's data comes back and no quadrant requests are
        // issued.
        let mock = ScriptedHttpClient::new([
            Err(FetchError::Timeout),
            Err(FetchError::Status(429)),
            Ok(body_with_nodes(&[7, 8, 9])),
        ]);
        let fetcher = ResilientFetcher::new(mock, test_config());
        let result = fetcher.execute(&plan()).await;
        assert_eq!(ids(&result), vec![7, 8, 9]);

        let snap = fetcher.metrics().snapshot();
        assert_eq!(snap.mirror_attempts, 3);
        assert_eq!(snap.mirror_failures, 2);
        assert_eq!(snap.subdivisions, 0);
    }

    #[tokio::test]
    async fn test_requests_hit_mirrors_in_priority_order() {
        let mock = Arc::new(ScriptedHttpClient::new([
            Err(FetchError::Http("down".to_string())),
            Ok(body_with_nodes(&[1])),
        ]));
        let fetcher = ResilientFetcher::new(Arc::clone(&mock), test_config());
        fetcher.execute(&plan()).await;

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "http://m1/api");
        assert_eq!(requests[1].url, "http://m2/api");
        // Both attempts carry the same serialized query.
        assert_eq!(requests[0].body, requests[1].body);
        assert!(requests[0].body.contains("leisure"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_soft_failure() {
        let mock = ScriptedHttpClient::new([
            Ok(b"<html>rate limited</html>".to_vec()),
            Ok(body_with_nodes(&[4])),
        ]);
        let fetcher = ResilientFetcher::new(mock, test_config());
        let result = fetcher.execute(&plan()).await;
        assert_eq!(ids(&result), vec![4]);
        assert_eq!(fetcher.metrics().snapshot().mirror_failures, 1);
    }

    #[tokio::test]
    async fn test_empty_full_result_is_success_not_fallback() {
        // An empty-but-decodable full-area response is a valid "no data
        // here" answer; later mirrors and subdivision must not run.
        let mock = ScriptedHttpClient::new([Ok(body_with_nodes(&[]))]);
        let fetcher = ResilientFetcher::new(mock, test_config());
        let result = fetcher.execute(&plan()).await;
        assert!(result.is_empty());

        let snap = fetcher.metrics().snapshot();
        assert_eq!(snap.mirror_attempts, 1);
        assert_eq!(snap.subdivisions, 0);
        assert_eq!(snap.fetches_empty, 1);
    }

    #[tokio::test]
    async fn test_subdivision_merges_deduplicated_union() {
        // Full bbox fails on all 3 mirrors, then each quadrant succeeds on
        // its first mirror. Quadrants share element 10; the merged result
        // is the deduplicated union, first occurrence winning.
        let mock = ScriptedHttpClient::new([
            // Full-area stage: all mirrors fail.
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Status(504)),
            // Quadrant 1 (SW).
            Ok(body_with_nodes(&[10, 11])),
            // Quadrant 2 (SE).
            Ok(body_with_nodes(&[10, 12])),
            // Quadrant 3 (NW).
            Ok(body_with_nodes(&[13])),
            // Quadrant 4 (NE).
            Ok(body_with_nodes(&[11, 14])),
        ]);
        let fetcher = ResilientFetcher::new(mock, test_config());
        let result = fetcher.execute(&plan()).await;
        assert_eq!(ids(&result), vec![10, 11, 12, 13, 14]);

        let snap = fetcher.metrics().snapshot();
        assert_eq!(snap.subdivisions, 1);
        assert_eq!(snap.duplicates_dropped, 2);
        assert_eq!(snap.mirror_attempts, 7);
    }

    #[tokio::test]
    async fn test_quadrant_empty_result_tries_next_mirror() {
        // In the quadrant stage only a non-empty result wins the quadrant.
        let mock = ScriptedHttpClient::new([
            // Full-area stage fails everywhere.
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            // Quadrant 1: empty from m1, non-empty from m2.
            Ok(body_with_nodes(&[])),
            Ok(body_with_nodes(&[21])),
            // Quadrants 2-4: fail everywhere (3 mirrors each).
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
        ]);
        let fetcher = ResilientFetcher::new(mock, test_config());
        let result = fetcher.execute(&plan()).await;
        assert_eq!(ids(&result), vec![21]);
    }

    #[tokio::test]
    async fn test_total_failure_returns_empty_not_error() {
        // 3 full-area failures + 4 quadrants x 3 mirrors = 15 attempts,
        // bounded worst case, then an empty (valid) result.
        let script = (0..15).map(|_| Err(FetchError::Timeout));
        let mock = ScriptedHttpClient::new(script);
        let fetcher = ResilientFetcher::new(mock, test_config());
        let result = fetcher.execute(&plan()).await;
        assert!(result.is_empty());

        let snap = fetcher.metrics().snapshot();
        assert_eq!(snap.mirror_attempts, 15);
        assert_eq!(snap.mirror_failures, 15);
        assert_eq!(snap.fetches_empty, 1);
    }

    #[tokio::test]
    async fn test_quadrant_requests_carry_sub_bboxes_and_clauses() {
        let mut filters = FilterSet::default();
        filters.set_feature("playground:slide", "yes");
        let center = GeoPoint::new(38.7169, -9.1390).unwrap();
        let bbox = BoundingBox::around(center, 2000.0);
        let full_plan = build_plan(bbox, &filters, Duration::from_secs(8));

        let mock = Arc::new(ScriptedHttpClient::new([
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Err(FetchError::Timeout),
            Ok(body_with_nodes(&[1])),
            Ok(body_with_nodes(&[2])),
            Ok(body_with_nodes(&[3])),
            Ok(body_with_nodes(&[4])),
        ]));
        let fetcher = ResilientFetcher::new(Arc::clone(&mock), test_config());
        fetcher.execute(&full_plan).await;

        // 3 full-area attempts, then one winning attempt per quadrant;
        // quadrant queries reuse the filter clauses over each sub-box.
        let requests = mock.requests();
        assert_eq!(requests.len(), 7);
        for (request, quadrant) in requests[3..].iter().zip(bbox.quadrants()) {
            assert!(request.body.contains("[\"playground:slide\"=\"yes\"]"));
            assert!(request
                .body
                .contains(&format!("{},{}", quadrant.south, quadrant.west)));
        }
    }

    #[tokio::test]
    async fn test_discarded_elements_counted() {
        let body = br#"{"elements":[
            {"type":"way","id":5},
            {"type":"node","id":6,"lat":38.7,"lon":-9.1}
        ]}"#;
        let mock = ScriptedHttpClient::new([Ok(body.to_vec())]);
        let fetcher = ResilientFetcher::new(mock, test_config());
        let result = fetcher.execute(&plan()).await;
        assert_eq!(ids(&result), vec![6]);
        assert_eq!(fetcher.metrics().snapshot().elements_discarded, 1);
    }
}
