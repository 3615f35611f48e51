//! Lock-free fetch metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters recorded by the fetch pipeline.
///
/// All counters are monotonic and updated with relaxed ordering; readers
/// take a [`MetricsSnapshot`] rather than observing counters individually.
#[derive(Debug, Default)]
pub struct FetchMetrics {
    mirror_attempts: AtomicU64,
    mirror_failures: AtomicU64,
    subdivisions: AtomicU64,
    fetches_empty: AtomicU64,
    elements_returned: AtomicU64,
    elements_discarded: AtomicU64,
    duplicates_dropped: AtomicU64,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// One mirror request issued (any stage).
    pub fn mirror_attempt(&self) {
        self.mirror_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// One mirror request failed (non-2xx, timeout, transport, or decode).
    pub fn mirror_failure(&self) {
        self.mirror_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A full-bbox query failed on every mirror and fell back to quadrants.
    pub fn subdivision(&self) {
        self.subdivisions.fetch_add(1, Ordering::Relaxed);
    }

    /// A fetch completed with no elements (no data or total failure).
    pub fn empty_fetch(&self) {
        self.fetches_empty.fetch_add(1, Ordering::Relaxed);
    }

    /// Elements returned to the caller.
    pub fn elements_returned(&self, count: u64) {
        self.elements_returned.fetch_add(count, Ordering::Relaxed);
    }

    /// Elements dropped for unresolvable coordinates.
    pub fn elements_discarded(&self, count: u64) {
        self.elements_discarded.fetch_add(count, Ordering::Relaxed);
    }

    /// Duplicate elements dropped during quadrant merge.
    pub fn duplicates_dropped(&self, count: u64) {
        self.duplicates_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            mirror_attempts: self.mirror_attempts.load(Ordering::Relaxed),
            mirror_failures: self.mirror_failures.load(Ordering::Relaxed),
            subdivisions: self.subdivisions.load(Ordering::Relaxed),
            fetches_empty: self.fetches_empty.load(Ordering::Relaxed),
            elements_returned: self.elements_returned.load(Ordering::Relaxed),
            elements_discarded: self.elements_discarded.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`FetchMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub mirror_attempts: u64,
    pub mirror_failures: u64,
    pub subdivisions: u64,
    pub fetches_empty: u64,
    pub elements_returned: u64,
    pub elements_discarded: u64,
    pub duplicates_dropped: u64,
}
