//! Error types for the fetch pipeline.

/// A single upstream request failure.
///
/// Every variant is a soft failure at the fetch-loop level: the fetcher
/// advances to the next mirror or quadrant. Only the service layer decides
/// whether anything is surfaced, and total upstream failure is surfaced as
/// an empty result, not an error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (connection refused, DNS, TLS, ...).
    #[error("http error: {0}")]
    Http(String),

    /// Non-2xx response status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The request exceeded its per-attempt timeout and was aborted.
    #[error("request timed out")]
    Timeout,

    /// Response body was not the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),
}
