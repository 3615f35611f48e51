//! Fetch telemetry for observability.
//!
//! The caller-facing contract deliberately returns the same empty sequence
//! for "no playgrounds here" and "every mirror failed"; these counters are
//! the out-of-band signal that distinguishes the two. Lock-free atomics,
//! point-in-time snapshots for display.

mod metrics;

pub use metrics::{FetchMetrics, MetricsSnapshot};

use tracing_subscriber::EnvFilter;

/// Initializes process-wide logging.
///
/// Respects `RUST_LOG`; defaults to `info` for this crate. Safe to call
/// only once per process.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("playscout=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
